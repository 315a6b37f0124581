use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use schoolhouse_cli::seeder::{self, SeedConfig, StaffPerSchool};
use schoolhouse_core::hash_password;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "schoolhouse-cli")]
#[command(about = "Schoolhouse CLI - Administrative tools for Schoolhouse", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a system administrator account
    CreateSysadmin {
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed the database with fake schools, rooms, courses, staff and students
    Seed {
        /// Number of schools to create
        #[arg(short = 's', long, default_value = "3")]
        schools: usize,

        /// Teachers per school
        #[arg(long, default_value = "12")]
        teachers: usize,

        /// Admins per school
        #[arg(long, default_value = "1")]
        admins: usize,

        /// Lowest grade level (0 is kindergarten)
        #[arg(long, default_value = "9", value_parser = clap::value_parser!(i32).range(0..=12))]
        min_grade: i32,

        /// Highest grade level
        #[arg(long, default_value = "12", value_parser = clap::value_parser!(i32).range(0..=12))]
        max_grade: i32,

        /// Students per grade per school
        #[arg(long, default_value = "40")]
        students: usize,
    },
    /// Delete all schools and their data (keeps system admins)
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();

    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("❌ DATABASE_URL must be set");
        std::process::exit(1);
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("❌ Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::CreateSysadmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_sysadmin(&pool, first_name, last_name, email, password).await,
        Commands::Seed {
            schools,
            teachers,
            admins,
            min_grade,
            max_grade,
            students,
        } => {
            handle_seed(&pool, schools, teachers, admins, min_grade, max_grade, students).await
        }
        Commands::ClearSeed => handle_clear_seed(&pool).await,
    }
}

fn prompt_text(value: Option<String>, prompt: &str) -> String {
    if let Some(value) = value {
        return value;
    }
    match Input::new().with_prompt(prompt).interact_text() {
        Ok(value) => value,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {}", prompt.to_lowercase(), e);
            std::process::exit(1);
        }
    }
}

fn prompt_password(value: Option<String>) -> String {
    if let Some(value) = value {
        return value;
    }
    match Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords don't match")
        .interact()
    {
        Ok(value) => value,
        Err(e) => {
            eprintln!("❌ Failed to read password: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_create_sysadmin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let first_name = prompt_text(first_name, "First name");
    let last_name = prompt_text(last_name, "Last name");
    let email = prompt_text(email, "Email address");
    let password = prompt_password(password);

    if password.len() < 8 {
        eprintln!("\n❌ Password must be at least 8 characters");
        std::process::exit(1);
    }

    match create_system_admin(pool, &first_name, &last_name, &email, &password).await {
        Ok(()) => {
            println!("\n✅ System admin created successfully!");
            println!("   Email: {}", email);
            println!("   Name: {} {}", first_name, last_name);
        }
        Err(e) => {
            eprintln!("\n❌ Error creating system admin: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_seed(
    pool: &PgPool,
    schools: usize,
    teachers: usize,
    admins: usize,
    min_grade: i32,
    max_grade: i32,
    students: usize,
) {
    if min_grade > max_grade {
        eprintln!("❌ --min-grade must not exceed --max-grade");
        std::process::exit(1);
    }

    let config = SeedConfig::new(schools)
        .with_staff(StaffPerSchool {
            admins,
            teachers,
            ..Default::default()
        })
        .with_students((min_grade..=max_grade).collect(), students);

    if let Err(e) = seeder::seed_all(pool, config).await {
        eprintln!("\n❌ Error seeding database: {}", e);
        std::process::exit(1);
    }
}

async fn handle_clear_seed(pool: &PgPool) {
    if let Err(e) = seeder::clear_all(pool).await {
        eprintln!("\n❌ Error clearing seeded data: {}", e);
        std::process::exit(1);
    }
}

/// Inserts a `system_admin` staff row. System admins have no school and can
/// only be created here.
async fn create_system_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e))?;

    let inserted = sqlx::query_scalar::<_, uuid::Uuid>(
        "INSERT INTO staff (school_id, first_name, last_name, email, password, role)
         VALUES (NULL, $1, $2, $3, $4, 'system_admin')
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email.trim().to_lowercase())
    .bind(&hashed_password)
    .fetch_optional(db)
    .await?;

    if inserted.is_none() {
        return Err(format!("An account with email {} already exists", email).into());
    }
    Ok(())
}
