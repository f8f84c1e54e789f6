use crate::limits::MAX_STAY_NIGHTS;
use crate::model::{Money, StayRange};

use super::StoreError;

/// Total price for a stay: nightly rate × whole nights.
///
/// Dates are day-granular, so the night count is exact — there is no partial
/// day to prorate. Same-day and inverted ranges have no billable nights and
/// fail with `InvalidRange`.
pub fn quote_total(price_per_night: Money, stay: &StayRange) -> Result<Money, StoreError> {
    let nights = stay.nights();
    if nights <= 0 {
        return Err(StoreError::InvalidRange);
    }
    if nights > MAX_STAY_NIGHTS {
        return Err(StoreError::LimitExceeded("stay too long"));
    }
    price_per_night
        .checked_mul(nights)
        .ok_or(StoreError::LimitExceeded("total price overflow"))
}
