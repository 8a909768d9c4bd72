//! CLI auth command handlers for login, status, and logout.

use std::io::BufRead;

use crate::app::AppContext;
use crate::auth::LoginRequest;

/// Handle `wsoptv auth login <username>`.
pub async fn handle_login(
    app: &AppContext,
    username: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = match password.or_else(|| std::env::var("WSOPTV_PASSWORD").ok()) {
        Some(password) => password,
        None => read_password()?,
    };

    app.auth().login(LoginRequest::new(username, password)).await?;
    match app.auth().user() {
        Some(user) => println!("Signed in as {} ({})", user.name(), user.role),
        None => println!("Signed in"),
    }
    Ok(())
}

/// Handle `wsoptv auth status`.
pub async fn handle_status(app: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    app.auth().initialize().await;
    match app.auth().user() {
        Some(user) => {
            println!("Signed in as {} ({})", user.name(), user.username);
            println!("   Role:   {}", user.role);
            println!("   Status: {}", user.status);
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

/// Handle `wsoptv auth logout`.
pub async fn handle_logout(app: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    app.auth().logout().await;
    println!("Signed out");
    Ok(())
}

fn read_password() -> Result<String, Box<dyn std::error::Error>> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
