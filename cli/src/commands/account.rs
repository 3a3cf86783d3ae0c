use anyhow::Result;

use heft_core::models::{Account, NewAccount};
use heft_core::service::HeftService;
use heft_core::session::{AuthView, SessionContext};

use super::helpers::{prompt_secret, value_or_prompt};
use crate::config::Config;

/// Where the session lands after a completed signup or reset: back on the
/// login form, unless someone is already logged in.
fn back_to_login(session: &SessionContext, form: AuthView) -> Result<SessionContext> {
    if session.user().is_some() {
        return Ok(session.clone());
    }
    Ok(session.logout().show(form)?.show(AuthView::Login)?)
}

/// The saved session only changes once the account is created.
fn submit_signup(svc: &HeftService, config: &Config, form: &NewAccount) -> Result<Account> {
    let session = config.load_session()?;
    let account = svc.signup(form)?;
    config.save_session(&back_to_login(&session, AuthView::Signup)?)?;
    Ok(account)
}

/// A failed attempt leaves an existing login in place.
fn submit_login(
    svc: &HeftService,
    config: &Config,
    username: &str,
    password: &str,
) -> Result<Account> {
    let previous = config.load_session()?;
    let pending = previous.logout().begin_login(username)?;

    let result = svc.login(username, password);
    let session = pending.finish_login(result.is_ok())?;
    if result.is_ok() || previous.user().is_none() {
        config.save_session(&session)?;
    }
    Ok(result?)
}

fn submit_reset(
    svc: &HeftService,
    config: &Config,
    username: &str,
    answer: &str,
    new_password: &str,
    confirm: &str,
) -> Result<()> {
    let session = config.load_session()?;
    svc.reset_password(username, answer, new_password, confirm)?;
    config.save_session(&back_to_login(&session, AuthView::ForgotPassword)?)?;
    Ok(())
}

pub(crate) fn cmd_signup(
    svc: &HeftService,
    config: &Config,
    username: &str,
    question: Option<String>,
    json: bool,
) -> Result<()> {
    let password = prompt_secret("Password")?;
    let confirm_password = prompt_secret("Confirm password")?;
    let security_question = value_or_prompt(question, "Security question")?;
    let security_answer = prompt_secret("Security answer")?;

    let account = submit_signup(
        svc,
        config,
        &NewAccount {
            username: username.to_string(),
            password,
            confirm_password,
            security_question,
            security_answer,
        },
    )?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "username": account.username, "created_at": account.created_at })
        );
    } else {
        println!(
            "Account '{}' created. Run `heft account login {}` to sign in.",
            account.username, account.username
        );
    }
    Ok(())
}

pub(crate) fn cmd_login(svc: &HeftService, config: &Config, username: &str, json: bool) -> Result<()> {
    let password = prompt_secret("Password")?;
    let account = submit_login(svc, config, username, &password)?;

    if json {
        println!("{}", serde_json::json!({ "logged_in": account.username }));
    } else {
        println!("Logged in as {}", account.username);
    }
    Ok(())
}

pub(crate) fn cmd_logout(config: &Config, json: bool) -> Result<()> {
    let session = config.load_session()?;
    let previous = session.user().map(str::to_string);
    config.save_session(&session.logout())?;

    if json {
        println!("{}", serde_json::json!({ "logged_out": previous }));
    } else if let Some(user) = previous {
        println!("Logged out {user}");
    } else {
        eprintln!("Not logged in.");
    }
    Ok(())
}

pub(crate) fn cmd_reset(svc: &HeftService, config: &Config, username: &str, json: bool) -> Result<()> {
    let question = svc.security_question(username)?;
    eprintln!("{question}");
    let answer = prompt_secret("Answer")?;
    let new_password = prompt_secret("New password")?;
    let confirm = prompt_secret("Confirm new password")?;

    submit_reset(svc, config, username, &answer, &new_password, &confirm)?;

    if json {
        println!("{}", serde_json::json!({ "reset": username }));
    } else {
        println!("Password reset. Run `heft account login {username}` to sign in.");
    }
    Ok(())
}

/// `user` is who data commands would run as right now.
pub(crate) fn cmd_whoami(config: &Config, user: Option<&str>, json: bool) -> Result<()> {
    let mode = if config.require_login {
        "login"
    } else {
        "single-user"
    };
    if json {
        println!(
            "{}",
            serde_json::json!({
                "user": user,
                "mode": mode,
                "backend": config.backend.to_string(),
                "data_dir": config.data_dir.display().to_string(),
            })
        );
    } else {
        match user {
            Some(u) => println!("{u} ({mode} mode)"),
            None => println!("Not logged in ({mode} mode)"),
        }
        println!("  Backend:  {}", config.backend);
        println!("  Data dir: {}", config.data_dir.display());
    }
    Ok(())
}
