use std::sync::RwLock;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::ledger::{ExchangeRate, LedgerClient, LedgerError};
use crate::units::HBAR_DECIMALS;

#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("exchange rate cache has not been initialized")]
    NotInitialized,

    #[error("exchange rate is zero")]
    ZeroRate,

    #[error("failed to fetch exchange rate: {0}")]
    Fetch(#[from] LedgerError),
}

/// Holds one hbar/USD exchange rate for the lifetime of a session.
///
/// Nothing is loaded implicitly: call [`initialize`](Self::initialize) (or
/// [`initialize_with`](Self::initialize_with)) before converting, and
/// [`reset`](Self::reset) to drop the cached rate.
#[derive(Debug, Default)]
pub struct RateCache {
    rate: RwLock<Option<ExchangeRate>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the current rate from the ledger and cache it.
    pub async fn initialize(&self, client: &dyn LedgerClient) -> Result<ExchangeRate, RateError> {
        let rate = client.exchange_rate().await?;
        self.initialize_with(rate)?;
        Ok(rate)
    }

    pub fn initialize_with(&self, rate: ExchangeRate) -> Result<(), RateError> {
        if rate.hbar_equivalent == 0 || rate.cent_equivalent == 0 {
            return Err(RateError::ZeroRate);
        }
        debug!(
            hbar_equivalent = rate.hbar_equivalent,
            cent_equivalent = rate.cent_equivalent,
            "exchange rate cached"
        );
        *self.rate.write().unwrap_or_else(|p| p.into_inner()) = Some(rate);
        Ok(())
    }

    pub fn reset(&self) {
        *self.rate.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.current().is_some()
    }

    pub fn current(&self) -> Option<ExchangeRate> {
        *self.rate.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Hbar bought by `usd` dollars, rounded to tinybar precision.
    pub fn usd_to_hbar(&self, usd: Decimal) -> Result<Decimal, RateError> {
        let per_hbar = self.usd_per_hbar()?;
        Ok((usd / per_hbar)
            .round_dp_with_strategy(HBAR_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
            .normalize())
    }

    /// Dollar value of `hbar`, rounded to cents.
    pub fn hbar_to_usd(&self, hbar: Decimal) -> Result<Decimal, RateError> {
        let per_hbar = self.usd_per_hbar()?;
        let mut usd = (hbar * per_hbar).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        usd.rescale(2);
        Ok(usd)
    }

    fn usd_per_hbar(&self) -> Result<Decimal, RateError> {
        let rate = self.current().ok_or(RateError::NotInitialized)?;
        let per_hbar = rate.usd_per_hbar();
        if per_hbar.is_zero() {
            return Err(RateError::ZeroRate);
        }
        Ok(per_hbar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::context::LedgerId;
    use crate::ledger::{AccountId, SandboxLedger};

    fn rate(hbar: u64, cents: u64) -> ExchangeRate {
        ExchangeRate {
            hbar_equivalent: hbar,
            cent_equivalent: cents,
            expiration_time: Utc::now(),
        }
    }

    #[test]
    fn conversions_fail_until_initialized() {
        let cache = RateCache::new();
        assert!(!cache.is_initialized());
        assert!(matches!(
            cache.usd_to_hbar(dec!(1)),
            Err(RateError::NotInitialized)
        ));
    }

    #[test]
    fn converts_both_directions() {
        let cache = RateCache::new();
        // 30 cents buy 1 hbar
        cache.initialize_with(rate(1, 30)).unwrap();

        assert_eq!(cache.usd_to_hbar(dec!(3)).unwrap(), dec!(10));
        assert_eq!(cache.usd_to_hbar(dec!(1)).unwrap(), dec!(3.33333333));
        assert_eq!(cache.hbar_to_usd(dec!(10)).unwrap(), dec!(3.00));
    }

    #[test]
    fn reset_clears_the_rate() {
        let cache = RateCache::new();
        cache.initialize_with(rate(1, 12)).unwrap();
        cache.reset();
        assert!(cache.current().is_none());
    }

    #[test]
    fn zero_rate_is_rejected() {
        let cache = RateCache::new();
        assert!(matches!(
            cache.initialize_with(rate(0, 12)),
            Err(RateError::ZeroRate)
        ));
    }

    #[tokio::test]
    async fn initializes_from_client() {
        let ledger = SandboxLedger::new(LedgerId::Testnet, AccountId::new(0, 0, 2), 10)
            .with_exchange_rate(2, 50);
        let cache = RateCache::new();
        let fetched = cache.initialize(&ledger).await.unwrap();

        assert_eq!(fetched.cent_equivalent, 50);
        assert_eq!(cache.hbar_to_usd(dec!(4)).unwrap(), dec!(1.00));
    }
}
