//! Interactive prompts for destructive or secret inputs.

use std::io::{self, IsTerminal, Write};

use dialoguer::{theme::ColorfulTheme, Confirm, Password};

fn use_dialoguer() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

fn read_line(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub(crate) fn prompt_yes_no(label: &str, default: bool) -> anyhow::Result<bool> {
    if use_dialoguer() {
        let theme = ColorfulTheme::default();
        let confirmed = Confirm::with_theme(&theme)
            .with_prompt(label)
            .default(default)
            .interact()?;
        return Ok(confirmed);
    }
    let default_text = if default { "Y/n" } else { "y/N" };
    let answer = read_line(&format!("{label} [{default_text}]: "))?.to_ascii_lowercase();
    if answer.is_empty() {
        return Ok(default);
    }
    match answer.as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        _ => anyhow::bail!("Please answer yes or no."),
    }
}

pub(crate) fn prompt_password(label: &str) -> anyhow::Result<String> {
    if use_dialoguer() {
        let theme = ColorfulTheme::default();
        let password = Password::with_theme(&theme)
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()?;
        return Ok(password);
    }
    read_line(&format!("{label}: "))
}
