use anyhow::{Context, Result};

use crate::command::CommandArgs;
use crate::handlers::{occupied_rooms, SHEET_TENANTS};
use crate::server::AppState;
use crate::util::format_currency;

/// `#cek_kamar [nomor_kamar]` — occupancy of one room, or of the whole
/// catalog when no room is given.
pub async fn handle_room_check(state: &AppState, args: &CommandArgs) -> Result<String> {
    let rows = state.store.get_all(SHEET_TENANTS).await?;
    let occupied = occupied_rooms(&rows);

    match args.args.first() {
        Some(room) => {
            if !state.config.is_valid_room(room) {
                return Ok(format!("Kamar {room} tidak terdaftar."));
            }
            let price = state
                .config
                .room_price(room)
                .with_context(|| format!("No price configured for room {room}"))?;
            let status = if occupied.iter().any(|r| r == room) {
                "terisi"
            } else {
                "tersedia"
            };
            Ok(format!(
                "Kamar {room}: {status}\nHarga: {} / bulan",
                format_currency(price)
            ))
        }
        None => {
            let mut reply = String::from("Status kamar:\n");
            for room in &state.config.rooms.available {
                let status = if occupied.iter().any(|r| r == room) {
                    "terisi"
                } else {
                    "tersedia"
                };
                let price = state.config.room_price(room).unwrap_or(0.0);
                reply.push_str(&format!(
                    "{room}: {status} ({} / bulan)\n",
                    format_currency(price)
                ));
            }
            Ok(reply.trim_end().to_string())
        }
    }
}

/// `#info_biaya [nomor_kamar]` — rent and deposit for one room, or the full
/// price list. Reads only the configured catalog.
pub async fn handle_cost_info(state: &AppState, args: &CommandArgs) -> Result<String> {
    match args.args.first() {
        Some(room) => {
            let Some(price) = state.config.room_price(room) else {
                return Ok(format!("Kamar {room} tidak terdaftar."));
            };
            Ok(format!(
                "Biaya kamar {room}:\n\
                 Sewa: {} / bulan\n\
                 Deposit: {} (dikembalikan saat checkout, dipotong biaya perawatan)",
                format_currency(price),
                format_currency(price)
            ))
        }
        None => {
            let mut reply = String::from("Daftar harga kamar:\n");
            for room in &state.config.rooms.available {
                let price = state.config.room_price(room).unwrap_or(0.0);
                reply.push_str(&format!("{room}: {} / bulan\n", format_currency(price)));
            }
            reply.push_str("Deposit sebesar satu bulan sewa.");
            Ok(reply)
        }
    }
}
