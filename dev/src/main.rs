use chrono::{DateTime, Utc};
use pgmodel::{Database, DatabaseBuilder, DatabaseConfig, Model, Op};

#[derive(Model, Debug, Default, Clone)]
#[orm(table = "option")]
struct AppOption {
    #[orm(column = "option_id", primary_key)]
    id: i32,
    code: String,
    value: Option<String>,
}

#[derive(Model, Debug, Default, Clone)]
struct UserGroup {
    #[orm(primary_key)]
    group_id: i32,
    name: String,
}

#[derive(Model, Debug, Default, Clone)]
#[orm(table = "user")]
struct User {
    #[orm(primary_key)]
    user_id: i32,
    #[orm(foreign_key = "user_group::group_id")]
    group_id: Option<i32>,
    username: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = DatabaseConfig::from_env()?;
    println!("Connecting with {}", serde_json::to_string(&config)?);
    DatabaseBuilder::from_config(config).connect().await?;
    println!("Connected!");

    // Raw rows
    let rows = Database::select("option", &["code", "value"], Some("code")).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);

    let rows = Database::select_where("option", "code = 'SITE_NAME'", &[], None).await?;
    println!("{}", serde_json::to_string(&rows)?);

    // Models
    for option in AppOption::select().await? {
        println!("Option #{} {} = {:?}", option.id, option.code, option.value);
    }

    for group in UserGroup::select().await? {
        println!("Group {}: {}", group.group_id, group.name);
    }

    if let Some(user) = User::select_where("user_id", Op::Eq, 1).await?.first() {
        println!(
            "User {:?} <{:?}> in group {:?}, created at {}",
            user.username,
            user.email,
            user.group_id,
            user.created_at.to_rfc3339()
        );
    }

    for (name, check) in [
        ("AppOption", Database::check_model::<AppOption>().await?),
        ("UserGroup", Database::check_model::<UserGroup>().await?),
        ("User", Database::check_model::<User>().await?),
    ] {
        if check.is_valid() {
            println!("  ✓ {} (table: {})", name, check.table);
        } else {
            println!("  ✗ {} - {}", name, serde_json::to_string(&check)?);
        }
    }

    // Scaffold a model from the live schema.
    if let Ok(table) = std::env::var("GENERATE_MODEL") {
        let path = Database::create_model("generated", &table).await?;
        println!("Generated {}", path.display());
    }

    Ok(())
}
