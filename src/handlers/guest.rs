use anyhow::Result;
use chrono::Local;

use crate::command::CommandArgs;
use crate::handlers::SHEET_GUESTS;
use crate::server::AppState;
use crate::store::Record;
use crate::util::{format_duration, format_phone_number, sanitize_input};

const DEFAULT_VISIT_MINUTES: u32 = 60;

/// `#tamu <nama> [menit]` — register a guest visit for the sender.
pub async fn handle_guest_registration(state: &AppState, args: &CommandArgs) -> Result<String> {
    if args.args.is_empty() {
        return Ok("Format: #tamu <nama_tamu> [durasi_menit]".to_string());
    }

    // A trailing numeric token is the visit duration; the rest is the name.
    let (name_tokens, minutes) = match args.args.last().map(|t| t.parse::<u32>()) {
        Some(Ok(minutes)) if args.args.len() > 1 => {
            (&args.args[..args.args.len() - 1], minutes)
        }
        _ => (&args.args[..], DEFAULT_VISIT_MINUTES),
    };
    let name = sanitize_input(&name_tokens.join(" "));

    let record: Record = [
        (
            "Tanggal",
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        ("Telepon", format_phone_number(&args.from_number)),
        ("NamaTamu", name.clone()),
        ("Durasi", minutes.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    state.store.append(SHEET_GUESTS, &record).await?;

    Ok(format!(
        "Tamu {name} terdaftar untuk kunjungan {}.",
        format_duration(minutes)
    ))
}
