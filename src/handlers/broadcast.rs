use anyhow::Result;
use tracing::warn;

use crate::command::CommandArgs;
use crate::handlers::{SHEET_TENANTS, STATUS_ACTIVE};
use crate::server::AppState;
use crate::util::{format_phone_number, sanitize_input};

/// `#broadcast <pesan...>` — admin-only: send a message to every active
/// tenant. Individual send failures are tolerated and counted.
pub async fn handle_broadcast(state: &AppState, args: &CommandArgs) -> Result<String> {
    let phone = format_phone_number(&args.from_number);
    if !state.config.is_admin(&phone) {
        return Ok("Maaf, perintah ini hanya untuk admin.".to_string());
    }
    if args.args.is_empty() {
        return Ok("Format: #broadcast <pesan>".to_string());
    }

    let text = sanitize_input(&args.args.join(" "));
    let rows = state.store.get_all(SHEET_TENANTS).await?;

    let mut sent = 0usize;
    let mut failed = 0usize;
    for tenant in &rows {
        if tenant.get("Status").map(String::as_str) != Some(STATUS_ACTIVE) {
            continue;
        }
        let Some(to) = tenant.get("Telepon") else {
            continue;
        };
        match state.gateway.send(to, &text).await {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!("Broadcast to {} failed: {:#}", to, e);
                failed += 1;
            }
        }
    }

    let mut reply = format!("Broadcast terkirim ke {sent} penghuni.");
    if failed > 0 {
        reply.push_str(&format!(" Gagal terkirim: {failed}."));
    }
    Ok(reply)
}
