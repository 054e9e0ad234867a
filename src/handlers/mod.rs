pub mod broadcast;
pub mod checkout;
pub mod faq;
pub mod guest;
pub mod payment;
pub mod registration;
pub mod reports;
pub mod rooms;

use anyhow::Result;

use crate::command::{Command, CommandArgs, FALLBACK_REPLY};
use crate::server::AppState;
use crate::store::Record;

pub const SHEET_TENANTS: &str = "Penghuni";
pub const SHEET_PAYMENTS: &str = "Pembayaran";
pub const SHEET_REPORTS: &str = "Laporan";
pub const SHEET_GUESTS: &str = "Tamu";
pub const SHEET_FAQ: &str = "FAQ";

/// Tenant status values in the Penghuni sheet.
pub const STATUS_ACTIVE: &str = "aktif";
pub const STATUS_LEFT: &str = "keluar";

/// Route a parsed command to its handler. Exactly one handler runs per
/// message; unknown keywords get the fixed fallback reply and never error.
/// Handler errors propagate unchanged to the webhook boundary.
pub async fn dispatch(state: &AppState, keyword: &str, args: CommandArgs) -> Result<String> {
    let Some(command) = Command::from_keyword(keyword) else {
        return Ok(FALLBACK_REPLY.to_string());
    };

    match command {
        Command::Daftar => registration::handle_registration(state, &args).await,
        Command::CekKamar => rooms::handle_room_check(state, &args).await,
        Command::InfoBiaya => rooms::handle_cost_info(state, &args).await,
        Command::Lapor => reports::handle_report(state, &args).await,
        Command::Bayar => payment::handle_payment(state, &args).await,
        Command::Checkout => checkout::handle_checkout(state, &args).await,
        Command::Tamu => guest::handle_guest_registration(state, &args).await,
        Command::Faq => faq::handle_faq(state, &args).await,
        Command::Broadcast => broadcast::handle_broadcast(state, &args).await,
    }
}

fn is_active(record: &Record) -> bool {
    record.get("Status").map(String::as_str) == Some(STATUS_ACTIVE)
}

/// The sender's active tenant row, as (sheet row number, record).
/// `find_row` matches a single column, so the phone+status pair is scanned here.
pub(crate) async fn find_active_tenant(
    state: &AppState,
    phone: &str,
) -> Result<Option<(u32, Record)>> {
    let rows = state.store.get_all(SHEET_TENANTS).await?;
    for (i, record) in rows.into_iter().enumerate() {
        if record.get("Telepon").map(String::as_str) == Some(phone) && is_active(&record) {
            return Ok(Some((i as u32 + 2, record)));
        }
    }
    Ok(None)
}

/// Rooms currently held by an active tenant.
pub(crate) fn occupied_rooms(rows: &[Record]) -> Vec<String> {
    rows.iter()
        .filter(|r| is_active(r))
        .filter_map(|r| r.get("Kamar").cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, Local};

    use crate::config::Config;
    use crate::store::testing::MemStore;
    use crate::util::sheet_name_for_month;
    use crate::whatsapp::testing::RecordingGateway;

    const TENANT_HEADERS: &[&str] = &[
        "Nama",
        "Kamar",
        "Telepon",
        "TanggalMasuk",
        "JatuhTempo",
        "Deposit",
        "Status",
    ];

    fn config() -> Config {
        Config::parse(
            r#"
[whatsapp]
api_url = "https://graph.facebook.com/v19.0/123456"
api_token = "wa-token"
verify_token = "verify-me"

[sheets]
api_token = "sheets-token"
spreadsheet_id = "sheet-id"

[admin]
phone_numbers = ["08999999999"]

[rooms]
available = ["101", "102", "103"]

[rooms.prices]
"101" = 1500000.0
"102" = 1750000.0
"103" = 2000000.0
"#,
        )
        .unwrap()
    }

    fn seeded_store() -> MemStore {
        let due = (Local::now().date_naive() + Duration::days(10))
            .format("%Y-%m-%d")
            .to_string();
        MemStore::new()
            .with_sheet(
                SHEET_TENANTS,
                TENANT_HEADERS,
                &[
                    &[
                        ("Nama", "Budi"),
                        ("Kamar", "101"),
                        ("Telepon", "08123456789"),
                        ("TanggalMasuk", "2026-01-15"),
                        ("JatuhTempo", due.leak()),
                        ("Deposit", "1500000"),
                        ("Status", "aktif"),
                    ],
                    &[
                        ("Nama", "Siti"),
                        ("Kamar", "102"),
                        ("Telepon", "08222222222"),
                        ("TanggalMasuk", "2025-11-01"),
                        ("JatuhTempo", "2026-08-01"),
                        ("Deposit", "1750000"),
                        ("Status", "keluar"),
                    ],
                ],
            )
            .with_sheet(
                SHEET_REPORTS,
                &["Tanggal", "Telepon", "Kamar", "Laporan", "Status"],
                &[],
            )
            .with_sheet(
                SHEET_GUESTS,
                &["Tanggal", "Telepon", "NamaTamu", "Durasi"],
                &[],
            )
            .with_sheet(
                SHEET_FAQ,
                &["Pertanyaan", "Jawaban"],
                &[&[
                    ("Pertanyaan", "Jam berapa gerbang ditutup?"),
                    ("Jawaban", "Gerbang ditutup pukul 23.00."),
                ]],
            )
    }

    fn state_with(store: MemStore) -> (AppState, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::default());
        let state = AppState {
            config: Arc::new(config()),
            store: Arc::new(store),
            gateway: gateway.clone(),
        };
        (state, gateway)
    }

    fn args(from: &str, args: &[&str]) -> CommandArgs {
        CommandArgs {
            from_number: from.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_unknown_keyword_returns_fallback() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#menu", args("08123456789", &[]))
            .await
            .unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_room_check_occupied_room() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#cek_kamar", args("08123456789", &["101"]))
            .await
            .unwrap();
        assert!(reply.contains("101"));
        assert!(reply.contains("terisi"));
    }

    #[tokio::test]
    async fn test_room_check_available_room() {
        let (state, _) = state_with(seeded_store());
        // 102's tenant has checked out
        let reply = dispatch(&state, "#cek_kamar", args("08123456789", &["102"]))
            .await
            .unwrap();
        assert!(reply.contains("tersedia"));
        assert!(reply.contains("Rp 1,750,000"));
    }

    #[tokio::test]
    async fn test_room_check_lists_all_rooms() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#cek_kamar", args("08123456789", &[]))
            .await
            .unwrap();
        for room in ["101", "102", "103"] {
            assert!(reply.contains(room), "missing room {room}: {reply}");
        }
    }

    #[tokio::test]
    async fn test_room_check_unknown_room() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#cek_kamar", args("08123456789", &["999"]))
            .await
            .unwrap();
        assert!(reply.contains("tidak terdaftar"));
    }

    #[tokio::test]
    async fn test_cost_info_single_room() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#info_biaya", args("08123456789", &["103"]))
            .await
            .unwrap();
        assert!(reply.contains("Rp 2,000,000"));
    }

    #[tokio::test]
    async fn test_registration_appends_tenant() {
        let store = seeded_store();
        let (state, _) = state_with(store);
        let reply = dispatch(&state, "#daftar", args("08333333333", &["Joko", "103"]))
            .await
            .unwrap();
        assert!(reply.contains("Joko"));
        assert!(reply.contains("103"));
        assert!(reply.contains("Rp 2,000,000"));

        let rows = state.store.get_all(SHEET_TENANTS).await.unwrap();
        assert_eq!(rows.len(), 3);
        let new = &rows[2];
        assert_eq!(new["Telepon"], "08333333333");
        assert_eq!(new["Status"], STATUS_ACTIVE);
    }

    #[tokio::test]
    async fn test_registration_rejects_occupied_room() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#daftar", args("08333333333", &["Joko", "101"]))
            .await
            .unwrap();
        assert!(reply.contains("terisi"));
        assert_eq!(state.store.get_all(SHEET_TENANTS).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_registration_joins_multi_word_names() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(
            &state,
            "#daftar",
            args("08333333333", &["Joko", "Widodo", "103"]),
        )
        .await
        .unwrap();
        assert!(reply.contains("Joko Widodo"));
    }

    #[tokio::test]
    async fn test_registration_usage_reply() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#daftar", args("08333333333", &["Joko"]))
            .await
            .unwrap();
        assert!(reply.contains("Format"));
    }

    #[tokio::test]
    async fn test_payment_accepted_and_due_date_advances() {
        let store = seeded_store();
        store.add_empty_sheet(
            &sheet_name_for_month(SHEET_PAYMENTS),
            &["Invoice", "Telepon", "Kamar", "Jumlah", "Denda", "Tanggal"],
        );
        let (state, _) = state_with(store);

        // Budi's due date is 10 days out, so no late fee: rent only.
        let reply = dispatch(&state, "#bayar", args("08123456789", &["1500000"]))
            .await
            .unwrap();
        assert!(reply.contains("Pembayaran diterima"));
        assert!(reply.contains("INV-"));

        let tenants = state.store.get_all(SHEET_TENANTS).await.unwrap();
        let old_due = (Local::now().date_naive() + Duration::days(10))
            .format("%Y-%m-%d")
            .to_string();
        let new_due = (Local::now().date_naive() + Duration::days(40))
            .format("%Y-%m-%d")
            .to_string();
        assert_ne!(tenants[0]["JatuhTempo"], old_due);
        assert_eq!(tenants[0]["JatuhTempo"], new_due);
    }

    #[tokio::test]
    async fn test_payment_wrong_amount_rejected() {
        let store = seeded_store();
        store.add_empty_sheet(
            &sheet_name_for_month(SHEET_PAYMENTS),
            &["Invoice", "Telepon", "Kamar", "Jumlah", "Denda", "Tanggal"],
        );
        let (state, _) = state_with(store);

        let reply = dispatch(&state, "#bayar", args("08123456789", &["1000000"]))
            .await
            .unwrap();
        assert!(reply.contains("tidak sesuai"));
        assert!(reply.contains("Rp 1,500,000"));
    }

    #[tokio::test]
    async fn test_payment_from_unregistered_sender() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#bayar", args("08777777777", &["1500000"]))
            .await
            .unwrap();
        assert!(reply.contains("belum terdaftar"));
    }

    #[tokio::test]
    async fn test_checkout_returns_deposit_minus_maintenance() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#checkout", args("08123456789", &["200000"]))
            .await
            .unwrap();
        assert!(reply.contains("Rp 1,300,000"));

        let tenants = state.store.get_all(SHEET_TENANTS).await.unwrap();
        assert_eq!(tenants[0]["Status"], STATUS_LEFT);
    }

    #[tokio::test]
    async fn test_checkout_deposit_never_negative() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#checkout", args("08123456789", &["9000000"]))
            .await
            .unwrap();
        assert!(reply.contains("Rp 0"));
    }

    #[tokio::test]
    async fn test_report_is_sanitized_and_stored() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(
            &state,
            "#lapor",
            args("08123456789", &["keran", "<bocor>"]),
        )
        .await
        .unwrap();
        assert!(reply.contains("Laporan diterima"));

        let reports = state.store.get_all(SHEET_REPORTS).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["Laporan"], "keran bocor");
        assert_eq!(reports[0]["Kamar"], "101");
    }

    #[tokio::test]
    async fn test_guest_registration() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#tamu", args("08123456789", &["Andi", "90"]))
            .await
            .unwrap();
        assert!(reply.contains("Andi"));
        assert!(reply.contains("1 jam 30 menit"));

        let guests = state.store.get_all(SHEET_GUESTS).await.unwrap();
        assert_eq!(guests[0]["NamaTamu"], "Andi");
        assert_eq!(guests[0]["Durasi"], "90");
    }

    #[tokio::test]
    async fn test_faq_without_args_lists_commands() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#faq", args("08123456789", &[]))
            .await
            .unwrap();
        for keyword in ["#daftar", "#bayar", "#checkout"] {
            assert!(reply.contains(keyword), "missing {keyword}");
        }
    }

    #[tokio::test]
    async fn test_faq_searches_sheet() {
        let (state, _) = state_with(seeded_store());
        let reply = dispatch(&state, "#faq", args("08123456789", &["gerbang"]))
            .await
            .unwrap();
        assert!(reply.contains("23.00"));
    }

    #[tokio::test]
    async fn test_broadcast_requires_admin() {
        let (state, gateway) = state_with(seeded_store());
        let reply = dispatch(
            &state,
            "#broadcast",
            args("08123456789", &["Listrik", "padam"]),
        )
        .await
        .unwrap();
        assert!(reply.contains("admin"));
        assert!(gateway.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_active_tenants_only() {
        let (state, gateway) = state_with(seeded_store());
        let reply = dispatch(
            &state,
            "#broadcast",
            args("08999999999", &["Listrik", "padam", "besok"]),
        )
        .await
        .unwrap();
        assert!(reply.contains("1 penghuni"));

        let sent = gateway.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "08123456789");
        assert_eq!(sent[0].1, "Listrik padam besok");
    }

    #[tokio::test]
    async fn test_end_to_end_room_check_pipeline() {
        // spec scenario: "#cek_kamar 101" from a valid sender
        let (state, _) = state_with(seeded_store());
        let message = crate::whatsapp::InboundMessage {
            from_number: "08123456789".to_string(),
            text: "#cek_kamar 101".to_string(),
            media_url: None,
            received_at: chrono::Utc::now(),
        };
        let (keyword, parsed) = crate::command::parse_command(&message).unwrap();
        assert_eq!(keyword, "#cek_kamar");
        assert_eq!(parsed.args, vec!["101"]);

        let reply = dispatch(&state, &keyword, parsed).await.unwrap();
        assert!(reply.contains("terisi"));
    }
}
