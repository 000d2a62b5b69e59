use bcrypt::{hash, verify, DEFAULT_COST};
use std::io::{self, BufRead, Write};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🛡️  Media Generator - admin password hash");
    println!("=========================================");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    print!("Password: ");
    io::stdout().flush()?;
    let password = lines.next().transpose()?.unwrap_or_default();

    print!("Confirm password: ");
    io::stdout().flush()?;
    let confirm = lines.next().transpose()?.unwrap_or_default();

    if password.len() < 8 {
        eprintln!("❌ Password must be at least 8 characters long");
        std::process::exit(1);
    }
    if password != confirm {
        eprintln!("❌ Passwords do not match");
        std::process::exit(1);
    }

    let hashed = hash(&password, DEFAULT_COST)?;
    if !verify(&password, &hashed)? {
        eprintln!("❌ Hash verification failed");
        std::process::exit(1);
    }

    println!();
    println!("📝 Add this line to your .env file:");
    println!("ADMIN_PASSWORD_HASH={}", hashed);
    Ok(())
}
