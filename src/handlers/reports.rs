use anyhow::Result;
use chrono::Local;

use crate::command::CommandArgs;
use crate::handlers::{find_active_tenant, SHEET_REPORTS};
use crate::server::AppState;
use crate::store::Record;
use crate::util::{format_phone_number, sanitize_input};

/// `#lapor <keluhan...>` — file a maintenance/incident report. The sender's
/// room is attached when they are a registered tenant.
pub async fn handle_report(state: &AppState, args: &CommandArgs) -> Result<String> {
    if args.args.is_empty() {
        return Ok("Format: #lapor <keluhan>".to_string());
    }

    let text = sanitize_input(&args.args.join(" "));
    let phone = format_phone_number(&args.from_number);
    let room = match find_active_tenant(state, &phone).await? {
        Some((_, tenant)) => tenant.get("Kamar").cloned().unwrap_or_default(),
        None => "-".to_string(),
    };

    let record: Record = [
        (
            "Tanggal",
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        ("Telepon", phone),
        ("Kamar", room),
        ("Laporan", text),
        ("Status", "baru".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    state.store.append(SHEET_REPORTS, &record).await?;

    Ok("Laporan diterima 🙏\nKami akan segera menindaklanjuti.".to_string())
}
