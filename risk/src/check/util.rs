//! Small numeric helpers shared by the risk checks and the gate's
//! `max_safe_volume` computation. Plain `f64` throughout, since this
//! crate's signals are `f64` rather than `Decimal` (Design Note §9:
//! "monetary values and prices are fixed-precision or `float64` with
//! explicit rounding at boundaries").

/// Largest position size `risk_amount` buys at `price_risk_per_unit`,
/// i.e. the volume whose stop-loss distance consumes exactly
/// `risk_amount`. Returns `0.0` rather than dividing by zero when the
/// signal's entry and stop coincide.
pub fn position_size_for_risk(risk_amount: f64, price_risk_per_unit: f64) -> f64 {
    if price_risk_per_unit <= 0.0 {
        return 0.0;
    }
    risk_amount / price_risk_per_unit
}

/// Utility function to validate order size against position limits.
pub fn validate_order_size<T>(order_size: &T, max_size: &T) -> Result<(), &'static str>
where
    T: PartialOrd,
{
    if order_size > max_size {
        Err("Order size exceeds maximum allowed size")
    } else {
        Ok(())
    }
}

/// Utility function to check if an instrument is allowed for trading.
pub fn validate_instrument_allowed<T>(
    instrument: &T,
    allowed_instruments: &[T],
) -> Result<(), &'static str>
where
    T: PartialEq,
{
    if allowed_instruments.contains(instrument) {
        Ok(())
    } else {
        Err("Instrument not allowed for trading")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_size_for_risk_divides_by_price_risk() {
        assert_eq!(position_size_for_risk(150.0, 50.0), 3.0);
    }

    #[test]
    fn position_size_for_risk_is_zero_on_degenerate_stop() {
        assert_eq!(position_size_for_risk(150.0, 0.0), 0.0);
    }
}
