use thiserror::Error;

use crate::whatsapp::InboundMessage;

/// Reserved marker every command keyword starts with.
pub const COMMAND_MARKER: char = '#';

/// Reply for keywords no handler claims. The unknown-keyword path never errors.
pub const FALLBACK_REPLY: &str = "Maaf, perintah tidak dikenali. Ketik #faq untuk bantuan.";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid command format")]
pub struct ValidationError;

/// Parsed arguments handed to exactly one handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    pub from_number: String,
    pub args: Vec<String>,
}

/// Parse an inbound message into a lower-cased command keyword and its
/// whitespace-separated arguments.
///
/// The text must be non-empty after trimming and start with the command
/// marker; the marker alone is not a command. Runs of whitespace never
/// produce empty argument tokens.
pub fn parse_command(message: &InboundMessage) -> Result<(String, CommandArgs), ValidationError> {
    let text = message.text.trim();
    if !text.starts_with(COMMAND_MARKER) {
        return Err(ValidationError);
    }

    let mut parts = text.split_whitespace();
    let keyword = parts.next().ok_or(ValidationError)?.to_lowercase();
    if keyword.chars().count() <= 1 {
        // just the marker, no keyword characters
        return Err(ValidationError);
    }

    let args = parts.map(str::to_string).collect();
    Ok((
        keyword,
        CommandArgs {
            from_number: message.from_number.clone(),
            args,
        },
    ))
}

/// The closed set of recognized commands. Every variant maps to exactly one
/// handler; anything else gets [`FALLBACK_REPLY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Daftar,
    CekKamar,
    InfoBiaya,
    Lapor,
    Bayar,
    Checkout,
    Tamu,
    Faq,
    Broadcast,
}

impl Command {
    /// Exact match on the lower-cased keyword. No fuzzy or prefix matching.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "#daftar" => Some(Self::Daftar),
            "#cek_kamar" => Some(Self::CekKamar),
            "#info_biaya" => Some(Self::InfoBiaya),
            "#lapor" => Some(Self::Lapor),
            "#bayar" => Some(Self::Bayar),
            "#checkout" => Some(Self::Checkout),
            "#tamu" => Some(Self::Tamu),
            "#faq" => Some(Self::Faq),
            "#broadcast" => Some(Self::Broadcast),
            _ => None,
        }
    }
}
