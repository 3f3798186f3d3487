use super::fail;
use csmrest_core::{Login, RestClient};

pub async fn login(rest: &RestClient, login: &Login) {
    let attempt = Login::unauthorized(login.identity.clone());
    match rest.authenticate(&attempt).await {
        Ok(session) if session.is_authorized() => {
            println!("Logged in (status {}).", session.login_status())
        }
        Ok(session) => {
            eprintln!("Error: login returned {}", session.login_status());
            std::process::exit(1);
        }
        Err(e) => fail(e),
    }
}
