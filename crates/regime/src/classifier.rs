//! Eight-way regime classifier.
//!
//! Each sub-classifier reads the shared indicator set and contributes
//! one [`SubClassification`]; the union becomes the
//! [`RegimeSnapshot`] the validators and voting engine consume.

use crate::kernels::{
    self, adx, bollinger, classify_structure, keltner, last_valid, slope_degrees, sma,
    trailing_mean, trailing_percentile, volume_slope, Bands,
};
use confluence_core::{
    AlignmentTier, DirectionalBias, Frame, MarketPhase, RegimeIndicators, RegimeSnapshot,
    StructureTag, SubClassification, TrendRegime, TrendStrength, VolatilityLevel,
};
use thiserror::Error;

/// Bars required before classification is attempted.
pub const MIN_CLASSIFY_BARS: usize = 50;

const ADX_PERIOD: usize = 14;
const ATR_PERIOD: usize = 14;
const BB_PERIOD: usize = 20;
const BB_STDDEV: f64 = 2.0;
const KC_PERIOD: usize = 20;
const KC_MULT: f64 = 1.5;
const PIVOT_CONFIRM: usize = 3;
const ATR_PERCENTILE_WINDOW: usize = 100;
const BB_WIDTH_MEAN_WINDOW: usize = 50;
const SLOPE_WINDOW: usize = 50;
const VOLUME_WINDOW: usize = 20;

/// Vote weight each trend-vs-range voter carries.
const W_ADX: f64 = 1.5;
const W_STRUCTURE: f64 = 1.25;
const W_BB_RATIO: f64 = 1.0;
const W_SLOPE: f64 = 1.0;
/// Trending wins only with clear separation over ranging.
const TREND_MARGIN: f64 = 1.3;

#[derive(Debug, Error)]
pub enum RegimeError {
    #[error("classification needs {required} bars, frame has {got}")]
    InsufficientBars { required: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqueezeState {
    None,
    Compression,
    ExplosionUp,
    ExplosionDown,
}

#[derive(Debug, Clone, Copy)]
enum Shakeout {
    Spring,
    Upthrust,
}

/// Stateless classifier. Cheap to construct per call.
#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier;

impl RegimeClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classifies the frame into a full snapshot.
    ///
    /// # Errors
    /// Returns [`RegimeError::InsufficientBars`] below
    /// [`MIN_CLASSIFY_BARS`].
    pub fn classify(&self, frame: &Frame) -> Result<RegimeSnapshot, RegimeError> {
        let n = frame.len();
        if n < MIN_CLASSIFY_BARS {
            return Err(RegimeError::InsufficientBars {
                required: MIN_CLASSIFY_BARS,
                got: n,
            });
        }

        let di = adx(&frame.high, &frame.low, &frame.close, ADX_PERIOD);
        let atr_series = kernels::atr(&frame.high, &frame.low, &frame.close, ATR_PERIOD);
        let bb = bollinger(&frame.close, BB_PERIOD, BB_STDDEV);
        let kc = keltner(&frame.high, &frame.low, &frame.close, KC_PERIOD, KC_MULT);
        let mid20 = sma(&frame.close, BB_PERIOD);

        let bb_width_last = last_valid(&bb.width).unwrap_or(0.0);
        let bb_width_mean = trailing_mean(&bb.width, BB_WIDTH_MEAN_WINDOW);
        let bb_width_ratio = match bb_width_mean {
            Some(mean) if mean > 0.0 => bb_width_last / mean,
            _ => 1.0,
        };

        let indicators = RegimeIndicators {
            adx: last_valid(&di.adx).unwrap_or(0.0),
            plus_di: last_valid(&di.plus_di).unwrap_or(0.0),
            minus_di: last_valid(&di.minus_di).unwrap_or(0.0),
            atr: last_valid(&atr_series).unwrap_or(0.0),
            atr_percentile: trailing_percentile(&atr_series, ATR_PERCENTILE_WINDOW)
                .unwrap_or(50.0),
            bb_width: bb_width_last,
            bb_width_ratio,
            ema9: ema_last(&frame.close, 9),
            ema21: ema_last(&frame.close, 21),
            ema50: ema_last(&frame.close, 50),
            ema200: ema_last(&frame.close, 200),
            slope_deg: slope_degrees(&frame.close, SLOPE_WINDOW).unwrap_or(0.0),
            structure: classify_structure(&frame.high, &frame.low, PIVOT_CONFIRM),
        };

        let mut subs = Vec::with_capacity(8);

        let (trend, trend_score, sub) = trend_vs_range(&indicators);
        subs.push(sub);

        let (volatility, sub) = volatility_band(indicators.atr_percentile);
        subs.push(sub);

        let close_last = frame.close[n - 1];
        let (bias, alignment, sub) = directional_bias(close_last, &indicators);
        subs.push(sub);

        let (strength, sub) = trend_strength(&indicators);
        subs.push(sub);

        subs.push(regime_shift(&di.adx));
        subs.push(atr_phase(&atr_series));

        let (squeeze, sub) = squeeze_state(&bb, &kc, &frame.close, &mid20);
        subs.push(sub);

        let shakeout = detect_shakeout(frame);
        let (phase, sub) = market_cycle(
            indicators.structure,
            volume_slope(&frame.volume, VOLUME_WINDOW),
            squeeze,
            shakeout,
        );
        subs.push(sub);

        tracing::debug!(
            symbol = %frame.symbol,
            timeframe = %frame.timeframe,
            trend = ?trend,
            volatility = ?volatility,
            bias = ?bias,
            phase = %phase,
            adx = indicators.adx,
            "regime classified"
        );

        Ok(RegimeSnapshot {
            trend,
            trend_score,
            volatility,
            bias,
            alignment,
            strength,
            phase,
            indicators,
            sub_classifications: subs,
        })
    }
}

fn ema_last(close: &[f64], period: usize) -> f64 {
    last_valid(&kernels::ema(close, period)).unwrap_or(0.0)
}

/// Weighted vote across ADX, swing structure, Bollinger width ratio,
/// and close slope.
fn trend_vs_range(ind: &RegimeIndicators) -> (TrendRegime, f64, SubClassification) {
    let mut trending = 0.0;
    let mut ranging = 0.0;

    if ind.adx > 25.0 {
        trending += W_ADX;
    } else if ind.adx < 20.0 {
        ranging += W_ADX;
    } else {
        trending += W_ADX / 2.0;
        ranging += W_ADX / 2.0;
    }

    match ind.structure {
        StructureTag::HhHl | StructureTag::LhLl => trending += W_STRUCTURE,
        StructureTag::Ranging => ranging += W_STRUCTURE,
    }

    if ind.bb_width_ratio > 1.1 {
        trending += W_BB_RATIO;
    } else if ind.bb_width_ratio < 0.9 {
        ranging += W_BB_RATIO;
    } else {
        trending += W_BB_RATIO / 2.0;
        ranging += W_BB_RATIO / 2.0;
    }

    let abs_slope = ind.slope_deg.abs();
    if abs_slope > 15.0 {
        trending += W_SLOPE;
    } else if abs_slope < 5.0 {
        ranging += W_SLOPE;
    } else {
        trending += W_SLOPE / 2.0;
        ranging += W_SLOPE / 2.0;
    }

    let total = trending + ranging;
    let (regime, score) = if trending > TREND_MARGIN * ranging {
        let up = if (ind.plus_di - ind.minus_di).abs() > f64::EPSILON {
            ind.plus_di > ind.minus_di
        } else {
            ind.slope_deg >= 0.0
        };
        let regime = if up {
            TrendRegime::TrendingUp
        } else {
            TrendRegime::TrendingDown
        };
        (regime, 100.0 * trending / total)
    } else {
        (TrendRegime::Ranging, 100.0 * ranging / total)
    };

    let (verdict, recommendation) = match regime {
        TrendRegime::TrendingUp => ("trending_up", "favor trend-following longs"),
        TrendRegime::TrendingDown => ("trending_down", "favor trend-following shorts"),
        TrendRegime::Ranging => ("ranging", "favor mean-reversion entries"),
    };
    let sub = SubClassification::new("trend_vs_range", verdict, score, recommendation);
    (regime, score, sub)
}

/// ATR-percentile bands at 30 / 60 / 80.
fn volatility_band(percentile: f64) -> (VolatilityLevel, SubClassification) {
    use confluence_core::VolatilityLevel as V;
    let level = if percentile < 30.0 {
        V::Low
    } else if percentile <= 60.0 {
        V::Normal
    } else if percentile <= 80.0 {
        V::High
    } else {
        V::Extreme
    };
    let nearest_edge = [30.0, 60.0, 80.0]
        .iter()
        .map(|b| (percentile - b).abs())
        .fold(f64::INFINITY, f64::min);
    let confidence = (50.0 + nearest_edge * 2.0).min(95.0);
    let (verdict, recommendation) = match level {
        V::Low => ("low", "compression, breakout setups favored"),
        V::Normal => ("normal", "no volatility adjustment"),
        V::High => ("high", "widen stops, reduce size"),
        V::Extreme => ("extreme", "stand aside, block scalps"),
    };
    (
        level,
        SubClassification::new("volatility", verdict, confidence, recommendation),
    )
}

/// EMA stack bias: the full 9/21/50/200 stack is strong, price vs
/// EMA50 with a 9/21 cross is moderate, anything else neutral. An
/// unavailable EMA200 (short history) caps the tier at moderate.
fn directional_bias(
    close: f64,
    ind: &RegimeIndicators,
) -> (DirectionalBias, AlignmentTier, SubClassification) {
    let stack_ready = ind.ema9 > 0.0 && ind.ema21 > 0.0 && ind.ema50 > 0.0 && ind.ema200 > 0.0;

    let (bias, tier, confidence) = if stack_ready
        && close > ind.ema9
        && ind.ema9 > ind.ema21
        && ind.ema21 > ind.ema50
        && ind.ema50 > ind.ema200
    {
        (DirectionalBias::Bullish, AlignmentTier::Strong, 90.0)
    } else if stack_ready
        && close < ind.ema9
        && ind.ema9 < ind.ema21
        && ind.ema21 < ind.ema50
        && ind.ema50 < ind.ema200
    {
        (DirectionalBias::Bearish, AlignmentTier::Strong, 90.0)
    } else if ind.ema50 > 0.0 && close > ind.ema50 && ind.ema9 > ind.ema21 {
        (DirectionalBias::Bullish, AlignmentTier::Moderate, 65.0)
    } else if ind.ema50 > 0.0 && close < ind.ema50 && ind.ema9 < ind.ema21 {
        (DirectionalBias::Bearish, AlignmentTier::Moderate, 65.0)
    } else {
        (DirectionalBias::Neutral, AlignmentTier::Neutral, 50.0)
    };

    let (verdict, recommendation) = match bias {
        DirectionalBias::Bullish => ("bullish", "boost long candidates"),
        DirectionalBias::Bearish => ("bearish", "boost short candidates"),
        DirectionalBias::Neutral => ("neutral", "no directional boost"),
    };
    (
        bias,
        tier,
        SubClassification::new("directional_bias", verdict, confidence, recommendation),
    )
}

fn trend_strength(ind: &RegimeIndicators) -> (TrendStrength, SubClassification) {
    let strength = TrendStrength::from_adx(ind.adx);
    let side = if ind.plus_di >= ind.minus_di { "up" } else { "down" };
    let verdict = match strength {
        TrendStrength::Weak => "weak".to_string(),
        TrendStrength::Moderate => format!("moderate_{side}"),
        TrendStrength::Strong => format!("strong_{side}"),
        TrendStrength::VeryStrong => format!("very_strong_{side}"),
    };
    let confidence = (ind.adx * 1.6).clamp(30.0, 95.0);
    let recommendation = if strength.is_strong() {
        "trend filters bind"
    } else {
        "trend filters relaxed"
    };
    (
        strength,
        SubClassification::new("trend_strength", verdict, confidence, recommendation),
    )
}

/// Compares the latest ADX against its trailing 20-bar mean around the
/// 20/25 thresholds to flag an emerging or fading trend.
fn regime_shift(adx_series: &[f64]) -> SubClassification {
    let valid: Vec<f64> = adx_series
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    let Some((&last, history)) = valid.split_last() else {
        return SubClassification::new("regime_shift", "stable", 50.0, "no transition detected");
    };
    let window = &history[history.len().saturating_sub(20)..];
    let mean = if window.is_empty() {
        last
    } else {
        window.iter().sum::<f64>() / window.len() as f64
    };

    let (verdict, recommendation) = if last >= 25.0 && mean < 25.0 {
        ("trend_emerging", "early trend entries viable")
    } else if last <= 20.0 && mean > 20.0 {
        ("trend_fading", "tighten trend exposure")
    } else {
        ("stable", "no transition detected")
    };
    let confidence = if verdict == "stable" {
        60.0
    } else {
        ((last - mean).abs() * 3.0).clamp(50.0, 90.0)
    };
    SubClassification::new("regime_shift", verdict, confidence, recommendation)
}

/// Latest ATR against its trailing 20-bar mean, +-20% bands.
fn atr_phase(atr_series: &[f64]) -> SubClassification {
    let last = last_valid(atr_series).unwrap_or(0.0);
    let mean = trailing_mean(atr_series, 20).unwrap_or(last);
    let ratio = if mean > 0.0 { last / mean } else { 1.0 };

    let (verdict, recommendation) = if ratio > 1.2 {
        ("expansion", "ranges widening, trail looser")
    } else if ratio < 0.8 {
        ("contraction", "ranges tightening, expect breakout")
    } else {
        ("stable", "range steady")
    };
    let confidence = if verdict == "stable" {
        60.0
    } else {
        ((ratio - 1.0).abs() * 100.0).clamp(50.0, 90.0)
    };
    SubClassification::new("atr_phase", verdict, confidence, recommendation)
}

/// TTM-style squeeze: Bollinger inside Keltner is compression; the bar
/// that releases it is an explosion, signed by close against the
/// 20-bar mid line.
fn squeeze_state(
    bb: &Bands,
    kc: &Bands,
    close: &[f64],
    mid20: &[f64],
) -> (SqueezeState, SubClassification) {
    let n = close.len();
    let inside = |i: usize| -> Option<bool> {
        let (bu, bl, ku, kl) = (bb.upper[i], bb.lower[i], kc.upper[i], kc.lower[i]);
        (bu.is_finite() && bl.is_finite() && ku.is_finite() && kl.is_finite())
            .then(|| bu < ku && bl > kl)
    };

    let now = inside(n - 1);
    let prev = if n >= 2 { inside(n - 2) } else { None };

    let state = match (prev, now) {
        (_, Some(true)) => SqueezeState::Compression,
        (Some(true), Some(false)) => {
            let momentum = close[n - 1] - mid20.get(n - 1).copied().unwrap_or(close[n - 1]);
            if momentum >= 0.0 {
                SqueezeState::ExplosionUp
            } else {
                SqueezeState::ExplosionDown
            }
        }
        _ => SqueezeState::None,
    };

    let sub = match state {
        SqueezeState::Compression => SubClassification::new(
            "squeeze",
            "compression",
            80.0,
            "energy building, breakout watch",
        ),
        SqueezeState::ExplosionUp => {
            SubClassification::new("squeeze", "explosion_up", 85.0, "ride the release long")
        }
        SqueezeState::ExplosionDown => {
            SubClassification::new("squeeze", "explosion_down", 85.0, "ride the release short")
        }
        SqueezeState::None => SubClassification::new("squeeze", "none", 55.0, "no squeeze"),
    };
    (state, sub)
}

/// Spring / upthrust shakeout over the recent bars: a probe through
/// the prior range boundary on quiet volume that closes back inside.
fn detect_shakeout(frame: &Frame) -> Option<Shakeout> {
    let n = frame.len();
    if n < 30 {
        return None;
    }
    let recent = 5;
    let prior = &frame.low[n - 25..n - recent];
    let support = prior.iter().copied().fold(f64::MAX, f64::min);
    let prior_high = &frame.high[n - 25..n - recent];
    let resistance = prior_high.iter().copied().fold(f64::MIN, f64::max);
    let mean_volume =
        frame.volume[n - 20..].iter().sum::<f64>() / 20.0;
    let close_last = frame.close[n - 1];

    for i in n - recent..n {
        let quiet = frame.volume[i] < mean_volume;
        if frame.low[i] < support && close_last > support && quiet {
            return Some(Shakeout::Spring);
        }
        if frame.high[i] > resistance && close_last < resistance && quiet {
            return Some(Shakeout::Upthrust);
        }
    }
    None
}

/// Wyckoff-style phase from swing structure crossed with the volume
/// trend; squeeze states override inside a range, shakeouts override
/// everything.
fn market_cycle(
    structure: StructureTag,
    vol_slope: Option<f64>,
    squeeze: SqueezeState,
    shakeout: Option<Shakeout>,
) -> (MarketPhase, SubClassification) {
    let rising_volume = vol_slope.is_some_and(|s| s > 0.0);

    let (phase, verdict, confidence, recommendation) = match shakeout {
        Some(Shakeout::Spring) => (
            MarketPhase::Accumulation,
            "spring",
            85.0,
            "failed breakdown, longs favored",
        ),
        Some(Shakeout::Upthrust) => (
            MarketPhase::Distribution,
            "upthrust",
            85.0,
            "failed breakout, shorts favored",
        ),
        None => match (structure, squeeze) {
            (StructureTag::HhHl, _) if rising_volume => (
                MarketPhase::Markup,
                "markup",
                70.0,
                "uptrend with participation",
            ),
            (StructureTag::HhHl, _) => (
                MarketPhase::Distribution,
                "distribution",
                70.0,
                "uptrend losing participation",
            ),
            (StructureTag::LhLl, _) if rising_volume => (
                MarketPhase::Markdown,
                "markdown",
                70.0,
                "downtrend with participation",
            ),
            (StructureTag::LhLl, _) => (
                MarketPhase::Accumulation,
                "accumulation",
                70.0,
                "downtrend losing participation",
            ),
            (StructureTag::Ranging, SqueezeState::Compression) => (
                MarketPhase::Compression,
                "compression",
                75.0,
                "coiling range",
            ),
            (
                StructureTag::Ranging,
                SqueezeState::ExplosionUp | SqueezeState::ExplosionDown,
            ) => (
                MarketPhase::Explosion,
                "explosion",
                80.0,
                "range resolving",
            ),
            (StructureTag::Ranging, SqueezeState::None) => (
                MarketPhase::Transition,
                "transition",
                60.0,
                "no clear phase",
            ),
        },
    };
    (
        phase,
        SubClassification::new("market_cycle", verdict, confidence, recommendation),
    )
}
