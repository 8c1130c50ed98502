use coursekit_core::CourseKitError;
use coursekit_core::credentials::{CredentialProvider, Password};
use coursekit_core::error::CourseKitResult;
use dialoguer::Input;

/// Last in the chain: ask on the terminal.
pub struct PromptCredentials;

impl CredentialProvider for PromptCredentials {
    fn username(&self) -> CourseKitResult<Option<String>> {
        let username: String = Input::new()
            .with_prompt("Portal username")
            .interact_text()
            .map_err(|e| CourseKitError::Credentials(e.to_string()))?;

        let username = username.trim().to_string();
        Ok((!username.is_empty()).then_some(username))
    }

    fn password(&self, username: &str) -> CourseKitResult<Option<Password>> {
        let password = rpassword::prompt_password(format!("Password for {username}: "))
            .map_err(|e| CourseKitError::Credentials(format!("Failed to read password: {e}")))?;

        Ok(Some(Password::new(password)))
    }
}
