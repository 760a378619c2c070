//! Credential setup and removal commands.
//!
//! Handles:
//! - `setup-credentials` - Two-step prompt for the session key and org ID
//! - `clear-credentials` - Delete both secrets and show "No credentials"

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use claude_usage_bar::config::schema::Config;
use claude_usage_bar::credentials::{
    FileSecretStore, SecretStore, SECRET_KEY_ORG_ID, SECRET_KEY_SESSION,
};

use super::status::{block_on, one_shot_refresher, print_view};

/// Result of the interactive prompt.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PromptOutcome {
    /// Both steps answered; non-empty answers were stored.
    Saved,
    /// Input ended before both steps were answered.
    Cancelled,
}

/// Hide all but the last four characters of a secret.
pub(crate) fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(8), tail)
}

/// Ask one question. `None` on end of input.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    current: Option<&str>,
) -> io::Result<Option<String>> {
    match current {
        Some(current) if !current.is_empty() => write!(output, "{} [{}]: ", prompt, current)?,
        _ => write!(output, "{}: ", prompt)?,
    }
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Prompt for both secrets and store the non-empty answers.
///
/// An empty answer keeps the current value. End of input at either step
/// cancels; a session key entered at step 1 is kept in that case.
pub(crate) fn prompt_credentials<K, R, W>(
    secrets: &K,
    input: &mut R,
    output: &mut W,
) -> io::Result<PromptOutcome>
where
    K: SecretStore + ?Sized,
    R: BufRead,
    W: Write,
{
    let current_session = secrets.get(SECRET_KEY_SESSION).map(|s| mask_secret(&s));
    let Some(session_key) = ask(
        input,
        output,
        "Step 1/2: Enter your Claude session key (sk-ant-...)",
        current_session.as_deref(),
    )?
    else {
        return Ok(PromptOutcome::Cancelled);
    };
    if !session_key.is_empty() {
        secrets
            .store(SECRET_KEY_SESSION, &session_key)
            .map_err(io::Error::other)?;
    }

    let current_org = secrets.get(SECRET_KEY_ORG_ID);
    let Some(org_id) = ask(
        input,
        output,
        "Step 2/2: Enter your Claude organization ID",
        current_org.as_deref(),
    )?
    else {
        return Ok(PromptOutcome::Cancelled);
    };
    if !org_id.is_empty() {
        secrets
            .store(SECRET_KEY_ORG_ID, &org_id)
            .map_err(io::Error::other)?;
    }

    Ok(PromptOutcome::Saved)
}

/// `cub setup-credentials`.
pub(crate) fn run_setup_credentials_command(config: &Config) -> ExitCode {
    let secrets = FileSecretStore::new();
    let stdin = io::stdin();
    // Prompts go to stderr so stdout stays a clean status stream.
    let outcome = prompt_credentials(&secrets, &mut stdin.lock(), &mut io::stderr());

    match outcome {
        Ok(PromptOutcome::Saved) => {
            eprintln!("Credentials saved successfully");
        }
        Ok(PromptOutcome::Cancelled) => {
            eprintln!();
            eprintln!("Cancelled.");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: failed to save credentials: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let refresher = one_shot_refresher(config);
    if let Err(code) = block_on(refresher.force_refresh()) {
        return code;
    }
    print_view(config, refresher.sink().get());
    ExitCode::SUCCESS
}

/// `cub clear-credentials`.
pub(crate) fn run_clear_credentials_command(config: &Config) -> ExitCode {
    let secrets = FileSecretStore::new();
    for key in [SECRET_KEY_SESSION, SECRET_KEY_ORG_ID] {
        if let Err(e) = secrets.delete(key) {
            eprintln!("Error: failed to clear credentials: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let refresher = one_shot_refresher(config);
    refresher.cache().clear();
    eprintln!("Credentials cleared");
    refresher.show_message("No credentials");
    print_view(config, refresher.sink().get());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use claude_usage_bar::credentials::MemorySecretStore;
    use std::io::Cursor;

    fn run_prompt(secrets: &MemorySecretStore, input: &str) -> (PromptOutcome, String) {
        let mut output = Vec::new();
        let outcome = prompt_credentials(secrets, &mut Cursor::new(input), &mut output)
            .expect("prompt should not fail");
        (outcome, String::from_utf8(output).expect("utf8 prompt"))
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("sk-ant-sid01-abcd"), "********abcd");
    }

    #[test]
    fn test_prompt_stores_both_values() {
        let secrets = MemorySecretStore::new();
        let (outcome, prompts) = run_prompt(&secrets, "sk-ant-new\norg-123\n");

        assert_eq!(outcome, PromptOutcome::Saved);
        assert_eq!(secrets.get(SECRET_KEY_SESSION).as_deref(), Some("sk-ant-new"));
        assert_eq!(secrets.get(SECRET_KEY_ORG_ID).as_deref(), Some("org-123"));
        assert!(prompts.contains("Step 1/2"));
        assert!(prompts.contains("Step 2/2"));
    }

    #[test]
    fn test_empty_answers_keep_current_values() {
        let secrets = MemorySecretStore::with_credentials("sk-ant-old-1234", "org-old");
        let (outcome, prompts) = run_prompt(&secrets, "\n\n");

        assert_eq!(outcome, PromptOutcome::Saved);
        assert_eq!(
            secrets.get(SECRET_KEY_SESSION).as_deref(),
            Some("sk-ant-old-1234")
        );
        assert_eq!(secrets.get(SECRET_KEY_ORG_ID).as_deref(), Some("org-old"));
        assert!(prompts.contains("********1234"));
        assert!(!prompts.contains("sk-ant-old"));
        assert!(prompts.contains("[org-old]"));
    }

    #[test]
    fn test_eof_at_first_step_cancels() {
        let secrets = MemorySecretStore::new();
        let (outcome, _) = run_prompt(&secrets, "");

        assert_eq!(outcome, PromptOutcome::Cancelled);
        assert!(secrets.get(SECRET_KEY_SESSION).is_none());
    }

    #[test]
    fn test_eof_at_second_step_keeps_session_key() {
        let secrets = MemorySecretStore::new();
        let (outcome, _) = run_prompt(&secrets, "sk-ant-new\n");

        assert_eq!(outcome, PromptOutcome::Cancelled);
        assert_eq!(secrets.get(SECRET_KEY_SESSION).as_deref(), Some("sk-ant-new"));
        assert!(secrets.get(SECRET_KEY_ORG_ID).is_none());
    }

    #[test]
    fn test_answers_are_trimmed() {
        let secrets = MemorySecretStore::new();
        run_prompt(&secrets, "  sk-ant-x  \r\n org-1 \n");
        assert_eq!(secrets.get(SECRET_KEY_SESSION).as_deref(), Some("sk-ant-x"));
        assert_eq!(secrets.get(SECRET_KEY_ORG_ID).as_deref(), Some("org-1"));
    }
}
