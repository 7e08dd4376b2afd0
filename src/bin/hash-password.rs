use bcrypt::{hash, DEFAULT_COST};
use std::env;

/// Hashes the password given as the first argument, or `ADMIN_PASSWORD`
/// from the environment (`.env` included).
fn main() {
    dotenvy::dotenv().ok();

    let password = env::args()
        .nth(1)
        .or_else(|| env::var("ADMIN_PASSWORD").ok())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| {
            eprintln!("Usage: hash-password <PASSWORD>   (or set ADMIN_PASSWORD)");
            std::process::exit(1);
        });

    if password.len() < 8 {
        eprintln!("Warning: passwords shorter than 8 characters are rejected by /api/auth/register");
    }

    match hash(&password, DEFAULT_COST) {
        Ok(hashed) => {
            println!("\nCost     : {}", DEFAULT_COST);
            println!("Hash     : {}\n", hashed);
            println!("# No-database login fallback, paste into .env:");
            println!("ADMIN_HASH_PASSWORD={}", hashed);
            println!("\n# With a database, run the seed binary instead; it stores this hash");
            println!("# in the users table for ADMIN_EMAIL.");
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
