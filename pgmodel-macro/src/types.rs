use syn::{GenericArgument, PathArguments, Type};

/// Returns the inner type when `ty` is an `Option<T>`.
///
/// Nullable columns are declared as `Option<T>` fields, so this doubles as the
/// nullability check for a property.
pub fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(GenericArgument::Type(inner_ty)) = args.args.first() {
            return Some(inner_ty);
        }
    }
    None
}

pub fn is_nullable(ty: &Type) -> bool {
    option_inner(ty).is_some()
}
