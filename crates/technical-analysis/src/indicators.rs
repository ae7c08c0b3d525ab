//! Indicator primitives.
//!
//! Every function returns a series aligned 1:1 with its input. A value that
//! needs more history than is available is `None`, never zero, so undefined
//! windows cannot leak into downstream averages.

use analysis_core::stats;

/// Trading days per year used for annualization
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Apply `f` to every full trailing window of `period` values.
/// A window containing any undefined value is itself undefined.
pub fn rolling<F>(data: &[Option<f64>], period: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    let mut window = Vec::with_capacity(period);
    for i in period - 1..data.len() {
        window.clear();
        window.extend(data[i + 1 - period..=i].iter().map_while(|v| *v));
        if window.len() == period {
            result[i] = Some(f(&window));
        }
    }
    result
}

fn defined(data: &[f64]) -> Vec<Option<f64>> {
    data.iter().copied().map(Some).collect()
}

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(&defined(data), period, stats::mean)
}

/// Exponential Moving Average with smoothing factor 2 / (span + 1),
/// seeded by the first defined value.
pub fn ema(data: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;

    data.iter()
        .map(|value| {
            let value = (*value)?;
            let next = match prev {
                Some(p) => alpha * value + (1.0 - alpha) * p,
                None => value,
            };
            prev = Some(next);
            Some(next)
        })
        .collect()
}

/// Relative Strength Index from simple rolling means of gains and losses.
///
/// A window with no losses reads 100; a window with no price change at all
/// reads 50.
pub fn rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let deltas: Vec<Option<f64>> = std::iter::once(None)
        .chain(data.windows(2).map(|w| Some(w[1] - w[0])))
        .take(data.len())
        .collect();
    let gains: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|d| d.max(0.0))).collect();
    let losses: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

    let avg_gain = rolling(&gains, period, stats::mean);
    let avg_loss = rolling(&losses, period, stats::mean);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(gain, loss)| {
            let (gain, loss) = ((*gain)?, (*loss)?);
            Some(if loss == 0.0 {
                if gain > 0.0 {
                    100.0
                } else {
                    50.0
                }
            } else {
                let rs = gain / loss;
                100.0 - 100.0 / (1.0 + rs)
            })
        })
        .collect()
}

/// MACD (Moving Average Convergence Divergence)
#[derive(Debug, Clone)]
pub struct MacdResult {
    pub macd_line: Vec<Option<f64>>,
    pub signal_line: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd(data: &[f64], fast_span: usize, slow_span: usize, signal_span: usize) -> MacdResult {
    let closes = defined(data);
    let ema_fast = ema(&closes, fast_span);
    let ema_slow = ema(&closes, slow_span);

    let macd_line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema(&macd_line, signal_span);
    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Bands at `middle ± num_std * σ`, σ being the population standard
/// deviation of the same window.
pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = sma(data, period);
    let sigma = rolling(&defined(data), period, stats::population_std_dev);

    let band = |sign: f64| -> Vec<Option<f64>> {
        middle
            .iter()
            .zip(&sigma)
            .map(|(m, s)| Some((*m)? + sign * num_std * (*s)?))
            .collect()
    };

    BollingerBands {
        upper: band(1.0),
        lower: band(-1.0),
        middle,
    }
}

/// Fractional change over `periods` bars: `data[i] / data[i - periods] - 1`.
pub fn pct_change(data: &[f64], periods: usize) -> Vec<Option<f64>> {
    (0..data.len())
        .map(|i| {
            if periods == 0 || i < periods {
                return None;
            }
            let base = data[i - periods];
            if base == 0.0 {
                None
            } else {
                Some(data[i] / base - 1.0)
            }
        })
        .collect()
}

/// Rolling sample standard deviation of returns, annualized, in percent.
pub fn rolling_volatility(returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let annualize = TRADING_DAYS_PER_YEAR.sqrt() * 100.0;
    rolling(returns, window, stats::std_dev)
        .into_iter()
        .map(|v| v.map(|sd| sd * annualize))
        .collect()
}

/// `numerator / denominator` element-wise; undefined when the denominator is
/// undefined or zero.
pub fn ratio(numerator: &[f64], denominator: &[Option<f64>]) -> Vec<Option<f64>> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| match d {
            Some(d) if *d != 0.0 => Some(n / d),
            _ => None,
        })
        .collect()
}
