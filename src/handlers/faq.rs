use anyhow::Result;

use crate::command::CommandArgs;
use crate::handlers::SHEET_FAQ;
use crate::server::AppState;

const HELP_TEXT: &str = "Daftar perintah:\n\
    #daftar <nama> <kamar> - daftar sebagai penghuni\n\
    #cek_kamar [kamar] - cek status kamar\n\
    #info_biaya [kamar] - info biaya sewa dan deposit\n\
    #bayar <jumlah> - bayar sewa bulanan\n\
    #lapor <keluhan> - laporkan masalah\n\
    #tamu <nama> [menit] - daftarkan kunjungan tamu\n\
    #checkout [biaya_perawatan] - akhiri sewa\n\
    #faq <kata_kunci> - cari jawaban pertanyaan umum";

/// `#faq [kata_kunci]` — the command list, or a keyword search over the FAQ
/// sheet's questions.
pub async fn handle_faq(state: &AppState, args: &CommandArgs) -> Result<String> {
    if args.args.is_empty() {
        return Ok(HELP_TEXT.to_string());
    }

    let keyword = args.args.join(" ").to_lowercase();
    let rows = state.store.get_all(SHEET_FAQ).await?;
    for row in &rows {
        let Some(question) = row.get("Pertanyaan") else {
            continue;
        };
        if question.to_lowercase().contains(&keyword) {
            let answer = row.get("Jawaban").cloned().unwrap_or_default();
            return Ok(format!("{question}\n\n{answer}"));
        }
    }

    Ok(format!(
        "Tidak ada jawaban untuk \"{keyword}\". Ketik #faq untuk daftar perintah."
    ))
}
