use anyhow::{Context, Result};
use chrono::{Duration, Local};

use crate::command::CommandArgs;
use crate::handlers::{occupied_rooms, SHEET_TENANTS, STATUS_ACTIVE};
use crate::server::AppState;
use crate::store::Record;
use crate::util::{format_currency, format_phone_number, is_valid_phone, sanitize_input};

/// `#daftar <nama> <nomor_kamar>` — register the sender as the tenant of a
/// free room. The last argument is the room; everything before it is the name.
pub async fn handle_registration(state: &AppState, args: &CommandArgs) -> Result<String> {
    if args.args.len() < 2 {
        return Ok("Format: #daftar <nama> <nomor_kamar>".to_string());
    }

    let room = args.args.last().context("argument list checked above")?;
    if !state.config.is_valid_room(room) {
        return Ok(format!(
            "Kamar {room} tidak terdaftar. Ketik #cek_kamar untuk melihat daftar kamar."
        ));
    }

    let phone = format_phone_number(&args.from_number);
    if !is_valid_phone(&phone) {
        return Ok("Nomor telepon Anda tidak dikenali sebagai nomor Indonesia.".to_string());
    }

    let rows = state.store.get_all(SHEET_TENANTS).await?;
    if occupied_rooms(&rows).iter().any(|r| r == room) {
        return Ok(format!("Maaf, kamar {room} sudah terisi."));
    }

    let name = sanitize_input(&args.args[..args.args.len() - 1].join(" "));
    let price = state
        .config
        .room_price(room)
        .with_context(|| format!("No price configured for room {room}"))?;

    let today = Local::now().date_naive();
    let due = today + Duration::days(30);

    let record: Record = [
        ("Nama", name.clone()),
        ("Kamar", room.to_string()),
        ("Telepon", phone),
        ("TanggalMasuk", today.format("%Y-%m-%d").to_string()),
        ("JatuhTempo", due.format("%Y-%m-%d").to_string()),
        ("Deposit", format!("{price:.0}")),
        ("Status", STATUS_ACTIVE.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    state.store.append(SHEET_TENANTS, &record).await?;

    Ok(format!(
        "Selamat datang, {name}! 🎉\n\
         Kamar {room} terdaftar atas nama Anda.\n\
         Sewa: {} / bulan\n\
         Deposit: {} (satu bulan sewa)\n\
         Jatuh tempo pertama: {}",
        format_currency(price),
        format_currency(price),
        due.format("%Y-%m-%d")
    ))
}
