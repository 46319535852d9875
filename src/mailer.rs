//! Low-attendance notices sent over SMTP.

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};

use crate::aggregate::StudentTally;
use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use crate::models::Student;

/// A defaulter paired with the address their notice goes to.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient<'a> {
    pub tally: &'a StudentTally,
    pub email: String,
}

/// Matches defaulters to roster emails by roll number. Students without an email are skipped and
/// logged.
pub fn recipients<'a>(defaulters: &[&'a StudentTally], roster: &[Student]) -> Vec<Recipient<'a>> {
    let emails: HashMap<String, &str> = roster
        .iter()
        .filter_map(|s| {
            let email = s.email.as_deref()?.trim();
            (!email.is_empty()).then(|| (s.roll_number.to_lowercase(), email))
        })
        .collect();

    defaulters
        .iter()
        .copied()
        .filter_map(|tally| match emails.get(&tally.roll_number.to_lowercase()) {
            Some(email) => Some(Recipient {
                tally,
                email: email.to_string(),
            }),
            None => {
                tracing::warn!(roll = %tally.roll_number, "no email on file, skipping notice");
                None
            }
        })
        .collect()
}

fn parse_cc(cc: Option<&str>) -> Result<Vec<Mailbox>> {
    cc.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Mailbox>().map_err(Error::from))
        .collect()
}

/// Builds the notice for one recipient.
pub fn compose(config: &SmtpConfig, recipient: &Recipient<'_>, threshold: f64) -> Result<Message> {
    let tally = recipient.tally;
    let to = Mailbox::new(Some(tally.full_name.clone()), recipient.email.parse()?);

    let mut builder = Message::builder()
        .from(config.sender.parse()?)
        .to(to)
        .subject(format!("Attendance below {threshold}%"))
        .header(ContentType::TEXT_PLAIN);
    for cc in parse_cc(config.cc.as_deref())? {
        builder = builder.cc(cc);
    }

    let body = format!(
        "Dear {},\n\n\
         Your attendance is {} ({} of {} sessions),\n\
         which is below the required {threshold}%.\n\
         Please meet your faculty advisor.\n",
        tally.full_name,
        tally.percentage(),
        tally.attended,
        tally.held,
    );

    Ok(builder.body(body)?)
}

/// Asks on stdin before going ahead. Only `y` proceeds.
pub fn confirm(prompt: &str) -> Result<bool> {
    ask(prompt, io::stdin().lock(), io::stdout())
}

fn ask(prompt: &str, mut input: impl BufRead, mut output: impl Write) -> Result<bool> {
    write!(output, "{prompt} y/[N]: ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// The SMTP login: the configured username, or the bare address of the sender.
fn login(config: &SmtpConfig) -> Result<String> {
    if let Some(username) = config.username.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(username.trim().to_string());
    }
    let sender: Mailbox = config.sender.parse()?;
    Ok(sender.email.to_string())
}

/// Sends one notice per recipient through the configured STARTTLS relay. The password is read
/// from `SMTP_PASSWORD`. Returns how many were sent.
pub fn send_notices(
    config: Option<&SmtpConfig>,
    recipients: &[Recipient<'_>],
    threshold: f64,
) -> Result<usize> {
    let config =
        config.ok_or_else(|| Error::MailSetup("no [smtp] section in the settings".to_string()))?;
    let password = env::var("SMTP_PASSWORD")
        .map_err(|_| Error::MailSetup("SMTP_PASSWORD is not set".to_string()))?;
    let username = login(config)?;

    let messages = recipients
        .iter()
        .map(|r| compose(config, r, threshold))
        .collect::<Result<Vec<_>>>()?;

    let mailer = SmtpTransport::starttls_relay(&config.host)?
        .credentials(Credentials::new(username, password))
        .build();

    for (recipient, message) in recipients.iter().zip(&messages) {
        mailer.send(message)?;
        tracing::info!(roll = %recipient.tally.roll_number, email = %recipient.email, "notice sent");
    }

    Ok(messages.len())
}
