use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Local, NaiveDate};

/// Tolerance for matching a payment against the billed amount.
pub const PAYMENT_TOLERANCE: f64 = 0.01;

/// Validate an Indonesian local phone number: "08" followed by 8-11 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() >= 10
        && phone.len() <= 13
        && phone.starts_with("08")
        && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Normalize a phone number to the local "08..." form.
/// Strips non-digits and rewrites a leading "62" country code to "0".
pub fn format_phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.strip_prefix("62") {
        Some(rest) => format!("0{rest}"),
        None => digits,
    }
}

/// Format an amount as Indonesian Rupiah with thousands separators,
/// e.g. `format_currency(15000.0) == "Rp 15,000"`.
pub fn format_currency(amount: f64) -> String {
    let value = amount.round() as i64;
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("Rp -{grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// Deposit returned at checkout after deducting maintenance costs. Never negative.
pub fn calculate_deposit_return(deposit: f64, maintenance_costs: f64) -> f64 {
    (deposit - maintenance_costs).max(0.0)
}

/// Whether a received amount matches the billed amount within `tolerance`.
pub fn validate_payment_amount(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance
}

/// Late-payment fee: 5% of rent per week late (partial weeks round up),
/// capped at 20%. Zero when not late.
pub fn calculate_late_fee(days_late: i64, rent_amount: f64) -> f64 {
    if days_late <= 0 {
        return 0.0;
    }
    let weeks_late = (days_late + 6) / 7;
    let penalty_rate = (weeks_late as f64 * 0.05).min(0.20);
    rent_amount * penalty_rate
}

/// Payment reminder text, selected by how close the due date is:
/// more than 5 days out is a gentle nudge, 1-5 days is urgent,
/// 0 or negative means the payment is overdue.
pub fn reminder_message(tenant_name: &str, room_number: &str, days_until_due: i64) -> String {
    if days_until_due > 5 {
        format!(
            "🔔 Reminder Pembayaran\n\n\
             Halo {tenant_name},\n\
             Pembayaran kost untuk kamar {room_number}\n\
             akan jatuh tempo dalam {days_until_due} hari.\n\n\
             Mohon siapkan pembayaran tepat waktu.\n\
             Terima kasih 🙏"
        )
    } else if days_until_due > 0 {
        format!(
            "⚠️ Reminder Pembayaran Segera\n\n\
             Halo {tenant_name},\n\
             Pembayaran kost untuk kamar {room_number}\n\
             akan jatuh tempo dalam {days_until_due} hari.\n\n\
             Mohon segera lakukan pembayaran\n\
             untuk menghindari denda keterlambatan.\n\
             Terima kasih 🙏"
        )
    } else {
        format!(
            "🚨 Pembayaran Telat\n\n\
             Halo {tenant_name},\n\
             Pembayaran kost untuk kamar {room_number}\n\
             telah melewati jatuh tempo.\n\n\
             Mohon segera lunasi pembayaran\n\
             untuk menghindari denda tambahan.\n\
             Terima kasih 🙏"
        )
    }
}

/// Format a minute count as a human-readable Indonesian duration.
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        format!("{minutes} menit")
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let mins = minutes % 60;
        if mins > 0 {
            format!("{hours} jam {mins} menit")
        } else {
            format!("{hours} jam")
        }
    } else {
        let days = minutes / 1440;
        let hours = (minutes % 1440) / 60;
        if hours > 0 {
            format!("{days} hari {hours} jam")
        } else {
            format!("{days} hari")
        }
    }
}

static INVOICE_SEQ: AtomicU32 = AtomicU32::new(0);

/// Generate an invoice number of the form `INV-<YYYYMMDDHHMMSS>-<seq>`.
/// The process-wide counter keeps same-second invocations distinct.
pub fn generate_invoice_number() -> String {
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let seq = INVOICE_SEQ.fetch_add(1, Ordering::Relaxed) % 1000;
    format!("INV-{timestamp}-{seq:03}")
}

/// Strip markup/injection characters from free-text input before it is
/// stored or echoed back.
pub fn sanitize_input(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '<' | '>' | '{' | '}' | '[' | ']' | '\\'))
        .collect()
}

/// Parse a `YYYY-MM-DD` date string.
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()
}

/// Sheet name with the current month suffix, e.g. "Pembayaran_2026_08".
pub fn sheet_name_for_month(base_name: &str) -> String {
    format!("{base_name}_{}", Local::now().format("%Y_%m"))
}
