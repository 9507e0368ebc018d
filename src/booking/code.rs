//! Коды броней вида `BK` + 6 цифр времени + 4 случайные цифры.

use chrono::Utc;
use rand::Rng;

pub const CODE_PREFIX: &str = "BK";

/// Код из миллисекундной метки и генератора. Уникальность гарантирует
/// хранилище, при коллизии вызывающий просто пробует снова.
pub fn generate<R: Rng + ?Sized>(now_millis: i64, rng: &mut R) -> String {
    format!(
        "{}{:06}{:04}",
        CODE_PREFIX,
        now_millis.rem_euclid(1_000_000),
        rng.gen_range(0..10_000)
    )
}

pub fn next_code() -> String {
    generate(Utc::now().timestamp_millis(), &mut rand::thread_rng())
}
