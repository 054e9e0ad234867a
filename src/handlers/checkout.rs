use anyhow::Result;

use crate::command::CommandArgs;
use crate::handlers::{find_active_tenant, SHEET_TENANTS, STATUS_LEFT};
use crate::server::AppState;
use crate::util::{calculate_deposit_return, format_currency, format_phone_number};

/// `#checkout [biaya_perawatan]` — end the sender's tenancy. The deposit is
/// returned minus maintenance costs and can never go negative.
pub async fn handle_checkout(state: &AppState, args: &CommandArgs) -> Result<String> {
    let maintenance = match args.args.first() {
        Some(raw) => match raw.replace(['.', ','], "").parse::<f64>() {
            Ok(value) => value,
            Err(_) => return Ok(format!("Biaya perawatan \"{raw}\" tidak valid.")),
        },
        None => 0.0,
    };

    let phone = format_phone_number(&args.from_number);
    let Some((row_number, tenant)) = find_active_tenant(state, &phone).await? else {
        return Ok("Anda tidak terdaftar sebagai penghuni aktif.".to_string());
    };

    let room = tenant.get("Kamar").cloned().unwrap_or_default();
    let deposit = tenant
        .get("Deposit")
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);
    let returned = calculate_deposit_return(deposit, maintenance);

    let mut updated = tenant.clone();
    updated.insert("Status".to_string(), STATUS_LEFT.to_string());
    state
        .store
        .update_row(SHEET_TENANTS, row_number, &updated)
        .await?;

    Ok(format!(
        "Checkout berhasil 👋\n\
         Kamar {room} kini tersedia kembali.\n\
         Deposit dikembalikan: {}\n\
         (deposit {} dikurangi biaya perawatan {})",
        format_currency(returned),
        format_currency(deposit),
        format_currency(maintenance)
    ))
}
