use anyhow::{Context, Result};
use chrono::{Duration, Local};

use crate::command::CommandArgs;
use crate::handlers::{find_active_tenant, SHEET_PAYMENTS, SHEET_TENANTS};
use crate::server::AppState;
use crate::store::Record;
use crate::util::{
    calculate_late_fee, format_currency, format_phone_number, generate_invoice_number,
    parse_date, sheet_name_for_month, validate_payment_amount, PAYMENT_TOLERANCE,
};

/// `#bayar <jumlah>` — record a monthly rent payment for the sender.
///
/// The billed amount is the room's rent plus the late fee accrued since the
/// tenant's due date. A matching payment is appended to the current month's
/// payment sheet and the due date advances by 30 days.
pub async fn handle_payment(state: &AppState, args: &CommandArgs) -> Result<String> {
    let Some(raw_amount) = args.args.first() else {
        return Ok("Format: #bayar <jumlah>".to_string());
    };
    let Ok(amount) = raw_amount.replace(['.', ','], "").parse::<f64>() else {
        return Ok(format!("Jumlah \"{raw_amount}\" tidak valid."));
    };

    let phone = format_phone_number(&args.from_number);
    let Some((row_number, tenant)) = find_active_tenant(state, &phone).await? else {
        return Ok(
            "Anda belum terdaftar sebagai penghuni. Ketik #daftar <nama> <nomor_kamar>."
                .to_string(),
        );
    };

    let room = tenant
        .get("Kamar")
        .cloned()
        .context("tenant row has no Kamar column")?;
    let rent = state
        .config
        .room_price(&room)
        .with_context(|| format!("No price configured for room {room}"))?;

    let today = Local::now().date_naive();
    let due = tenant.get("JatuhTempo").and_then(|s| parse_date(s));
    let days_late = due.map(|d| (today - d).num_days()).unwrap_or(0);
    let fee = calculate_late_fee(days_late, rent);
    let expected = rent + fee;

    if !validate_payment_amount(amount, expected, PAYMENT_TOLERANCE) {
        let mut reply = format!(
            "Jumlah tidak sesuai. Total tagihan: {}",
            format_currency(expected)
        );
        if fee > 0.0 {
            reply.push_str(&format!(
                "\n(termasuk denda keterlambatan {})",
                format_currency(fee)
            ));
        }
        return Ok(reply);
    }

    let invoice = generate_invoice_number();
    let payment: Record = [
        ("Invoice", invoice.clone()),
        ("Telepon", phone),
        ("Kamar", room.clone()),
        ("Jumlah", format!("{amount:.0}")),
        ("Denda", format!("{fee:.0}")),
        ("Tanggal", today.format("%Y-%m-%d").to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    state
        .store
        .append(&sheet_name_for_month(SHEET_PAYMENTS), &payment)
        .await?;

    // Advance the cycle from the old due date, falling back to today when the
    // tenant row carried no parseable date.
    let next_due = due.unwrap_or(today) + Duration::days(30);
    let mut updated = tenant.clone();
    updated.insert(
        "JatuhTempo".to_string(),
        next_due.format("%Y-%m-%d").to_string(),
    );
    state
        .store
        .update_row(SHEET_TENANTS, row_number, &updated)
        .await?;

    let mut reply = format!(
        "Pembayaran diterima ✅\n\
         Invoice: {invoice}\n\
         Kamar: {room}\n\
         Jumlah: {}",
        format_currency(amount)
    );
    if fee > 0.0 {
        reply.push_str(&format!("\nDenda keterlambatan: {}", format_currency(fee)));
    }
    reply.push_str(&format!(
        "\nJatuh tempo berikutnya: {}",
        next_due.format("%Y-%m-%d")
    ));
    Ok(reply)
}
