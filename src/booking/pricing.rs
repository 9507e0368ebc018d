use crate::models::Screening;

pub const DEFAULT_SEAT_CLASS: &str = "standard";

/// Цена места: тариф класса из `seat_prices`, иначе базовая цена сеанса.
pub fn seat_price(screening: &Screening, seat_class: &str) -> f64 {
    screening
        .seat_prices
        .get(seat_class)
        .copied()
        .unwrap_or(screening.price)
}

/// Сумма с округлением до копеек.
pub fn total(prices: impl IntoIterator<Item = f64>) -> f64 {
    let sum: f64 = prices.into_iter().sum();
    (sum * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScreeningStatus;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn screening() -> Screening {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        Screening {
            id: 1,
            movie_id: 1,
            theater_id: 1,
            room_id: 1,
            show_date: at.date(),
            show_time: at.time(),
            price: 12.5,
            seat_prices: HashMap::from([("vip".to_string(), 20.0)]),
            total_seats: 50,
            available_seats: 50,
            status: ScreeningStatus::Active,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn class_rate_overrides_base_price() {
        let s = screening();
        assert_eq!(seat_price(&s, "vip"), 20.0);
        assert_eq!(seat_price(&s, DEFAULT_SEAT_CLASS), 12.5);
        assert_eq!(total([12.5, 20.0, 0.1, 0.2]), 32.8);
    }
}
