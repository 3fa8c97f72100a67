//! KeyGenerator port - 合成キーの生成
//!
//! Tasks without a natural entity (notification e-mails, one-off messages)
//! still need a unique key. テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidKeyGenerator**: ULID ベース（本番用）

use crate::domain::TaskKey;
use crate::ports::Clock;
use ulid::Ulid;

/// KeyGenerator は合成キーを生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait KeyGenerator: Send + Sync {
    /// `"{prefix}-{unique}"` 形式のキーを生成
    fn generate(&self, prefix: &str) -> TaskKey;
}

/// UlidKeyGenerator は ULID ベースのキー生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// FixedClock を使えば timestamp 部分が決定的になります。
pub struct UlidKeyGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidKeyGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> KeyGenerator for UlidKeyGenerator<C> {
    fn generate(&self, prefix: &str) -> TaskKey {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        TaskKey::synthetic(prefix, ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn generates_unique_keys() {
        let keys = UlidKeyGenerator::new(SystemClock);

        let k1 = keys.generate("notify");
        let k2 = keys.generate("notify");
        let k3 = keys.generate("notify");

        assert_ne!(k1, k2);
        assert_ne!(k2, k3);
        assert_ne!(k1, k3);
        assert!(k1.as_str().starts_with("notify-"));
    }

    #[test]
    fn fixed_clock_pins_the_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let keys = UlidKeyGenerator::new(FixedClock::new(fixed_time));

        let k1 = keys.generate("otp");
        let k2 = keys.generate("otp");

        // ランダム部分があるので ID は異なる
        assert_ne!(k1, k2);

        let ulid1: Ulid = k1.as_str().trim_start_matches("otp-").parse().unwrap();
        let ulid2: Ulid = k2.as_str().trim_start_matches("otp-").parse().unwrap();
        assert_eq!(ulid1.timestamp_ms(), ulid2.timestamp_ms());
        assert_eq!(ulid1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
