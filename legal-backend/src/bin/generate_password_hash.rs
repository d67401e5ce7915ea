// src/bin/generate_password_hash.rs
//
// 予約済み管理者アカウント (uid 2) のパスワードハッシュを生成する。
// 出力したハッシュは users.password_hash に直接設定する。

use legal_backend::utils::password::{Argon2Config, PasswordManager, PasswordPolicy};
use std::env;
use std::io::{self, Write};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let password = match env::args().nth(1) {
        Some(password) => password,
        None => {
            print!("Enter password to hash: ");
            io::stdout().flush()?;

            let mut password = String::new();
            io::stdin().read_line(&mut password)?;
            password.trim().to_string()
        }
    };

    if password.is_empty() {
        eprintln!("Error: Password cannot be empty");
        std::process::exit(1);
    }

    let manager = PasswordManager::new(Argon2Config::from_env(), PasswordPolicy::default())?;
    let password_hash = manager.hash_password(&password)?;

    println!("\n=== Password Hash Generated ===");
    println!("Hash: {}", password_hash);
    println!("\nTo enable the administrator account:");
    println!(
        "UPDATE users SET password_hash = '{}', is_active = true WHERE uid = 2;",
        password_hash
    );

    Ok(())
}
