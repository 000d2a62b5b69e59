// Price quotes for image and video generation.
// All money math uses Decimal; amounts are rounded half-up to cents only when formatted.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const CURRENCY: &str = "USD";

/// 8%
fn tax_rate() -> Decimal {
    Decimal::new(8, 2)
}

fn dalle_unit_price(quality: &str, size: &str) -> Option<Decimal> {
    let cents_tenths = match (quality, size) {
        ("standard", "1024x1024") => 40,
        ("standard", "1024x1792" | "1792x1024") => 80,
        ("hd", "1024x1024") => 80,
        ("hd", "1024x1792" | "1792x1024") => 120,
        _ => return None,
    };
    Some(Decimal::new(cents_tenths, 3))
}

fn imagen_base_price(quality: &str) -> Option<Decimal> {
    match quality {
        "standard" => Some(Decimal::new(40, 3)),
        "high" => Some(Decimal::new(80, 3)),
        "ultra" => Some(Decimal::new(120, 3)),
        _ => None,
    }
}

fn imagen_size_multiplier(size: &str) -> Option<Decimal> {
    match size {
        "1024x1024" | "1152x896" | "896x1152" => Some(Decimal::ONE),
        "1024x1792" | "1792x1024" => Some(Decimal::new(175, 2)),
        _ => None,
    }
}

fn video_price_per_second(quality: &str) -> Option<Decimal> {
    match quality {
        "standard" => Some(Decimal::new(50, 2)),
        "high" => Some(Decimal::ONE),
        "ultra" => Some(Decimal::TWO),
        _ => None,
    }
}

fn resolution_multiplier(resolution: &str) -> Option<Decimal> {
    match resolution {
        "720p" => Some(Decimal::ONE),
        "1080p" => Some(Decimal::new(15, 1)),
        "4k" => Some(Decimal::new(3, 0)),
        _ => None,
    }
}

/// `(minimum count, discount)` from the highest tier down.
const BULK_DISCOUNTS: [(i64, i64); 4] = [(50, 20), (20, 15), (10, 10), (5, 5)];

pub fn bulk_discount(count: i64) -> Decimal {
    BULK_DISCOUNTS
        .iter()
        .find(|(min, _)| count >= *min)
        .map(|(_, pct)| Decimal::new(*pct, 2))
        .unwrap_or(Decimal::ZERO)
}

/// `$1.23`, rounded half-up.
pub fn format_usd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${:.2}", rounded)
}

fn percent(rate: Decimal) -> f64 {
    (rate * Decimal::ONE_HUNDRED).to_f64().unwrap_or_default()
}

fn is_dalle(model: &str) -> bool {
    matches!(model, "dall-e-3" | "openai")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingError {
    pub error: String,
    pub error_code: &'static str,
}

impl PricingError {
    fn new(error: impl Into<String>, error_code: &'static str) -> Self {
        Self {
            error: error.into(),
            error_code,
        }
    }

    pub fn missing_params() -> Self {
        Self::new("Missing pricing parameters", "MISSING_PARAMS")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageQuoteRequest {
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default = "default_image_model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoQuoteRequest {
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_duration")]
    pub duration: i64,
    #[serde(default = "default_resolution")]
    pub resolution: String,
}

fn default_count() -> i64 {
    1
}
fn default_quality() -> String {
    "standard".to_string()
}
fn default_size() -> String {
    "1024x1024".to_string()
}
fn default_image_model() -> String {
    "dall-e-3".to_string()
}
fn default_duration() -> i64 {
    5
}
fn default_resolution() -> String {
    "1080p".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct CostBreakdown {
    pub unit_price: String,
    pub subtotal: String,
    pub discount_rate: f64,
    pub discount_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<String>,
    pub tax_rate: f64,
    pub tax_amount: String,
    pub total: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub service: &'static str,
    pub provider: &'static str,
    pub pricing_model: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageQuoteParameters {
    pub count: i64,
    pub quality: String,
    pub size: String,
    pub model: String,
    pub unit_price: String,
    pub processing_batches: i64,
    pub estimated_time_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoQuoteParameters {
    pub count: i64,
    pub quality: String,
    pub duration: i64,
    pub resolution: String,
    pub base_price_per_second: String,
    pub resolution_multiplier: f64,
    pub estimated_time_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote<P> {
    pub success: bool,
    pub cost_breakdown: CostBreakdown,
    pub parameters: P,
    pub model_info: ModelInfo,
    pub currency: &'static str,
    pub calculation_timestamp: String,
}

pub type ImageQuote = Quote<ImageQuoteParameters>;
pub type VideoQuote = Quote<VideoQuoteParameters>;

fn validate_image_request(req: &ImageQuoteRequest) -> Result<(), PricingError> {
    let dalle = is_dalle(&req.model);
    let mut errors = Vec::new();

    if req.count < 1 {
        errors.push("Image count must be a positive integer".to_string());
    } else if dalle && req.count > 4 {
        errors.push("DALL-E 3 can generate at most 4 images per request".to_string());
    } else if !dalle && req.count > 50 {
        errors.push("At most 50 images can be generated per request".to_string());
    }

    let (service, quality_ok, size_ok) = if dalle {
        (
            "DALL-E 3",
            matches!(req.quality.as_str(), "standard" | "hd"),
            dalle_unit_price("standard", &req.size).is_some(),
        )
    } else {
        (
            "Imagen 4",
            imagen_base_price(&req.quality).is_some(),
            imagen_size_multiplier(&req.size).is_some(),
        )
    };
    if !quality_ok {
        errors.push(format!("{} does not support quality: {}", service, req.quality));
    }
    if !size_ok {
        errors.push(format!("{} does not support size: {}", service, req.size));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PricingError::new(errors.join("; "), "INVALID_PARAMS"))
    }
}

pub fn calculate_image_cost(req: &ImageQuoteRequest) -> Result<ImageQuote, PricingError> {
    validate_image_request(req)?;
    let dalle = is_dalle(&req.model);

    let (unit_price, max_batch, model_info) = if dalle {
        (
            dalle_unit_price(&req.quality, &req.size).unwrap_or(Decimal::new(40, 3)),
            1,
            ModelInfo {
                service: "DALL-E 3",
                provider: "OpenAI",
                pricing_model: "per_image_with_quality_size_tiers",
            },
        )
    } else {
        let base = imagen_base_price(&req.quality).unwrap_or(Decimal::new(40, 3));
        let multiplier = imagen_size_multiplier(&req.size).unwrap_or(Decimal::ONE);
        (
            base * multiplier,
            4,
            ModelInfo {
                service: "Imagen 4",
                provider: "Google Vertex AI",
                pricing_model: "per_image_with_quality_tiers",
            },
        )
    };

    let subtotal = unit_price * Decimal::from(req.count);
    let discount_rate = bulk_discount(req.count);
    let discount_amount = subtotal * discount_rate;
    let discounted = subtotal - discount_amount;
    let tax_amount = discounted * tax_rate();
    let total = discounted + tax_amount;

    let batches = (req.count + max_batch - 1) / max_batch;
    let estimated_time = if dalle { req.count * 20 } else { batches * 15 };

    Ok(Quote {
        success: true,
        cost_breakdown: CostBreakdown {
            unit_price: format_usd(unit_price),
            subtotal: format_usd(subtotal),
            discount_rate: percent(discount_rate),
            discount_amount: format_usd(discount_amount),
            discounted_price: Some(format_usd(discounted)),
            tax_rate: percent(tax_rate()),
            tax_amount: format_usd(tax_amount),
            total: format_usd(total),
        },
        parameters: ImageQuoteParameters {
            count: req.count,
            quality: req.quality.clone(),
            size: req.size.clone(),
            model: req.model.clone(),
            unit_price: format_usd(unit_price),
            processing_batches: batches,
            estimated_time_seconds: estimated_time,
        },
        model_info,
        currency: CURRENCY,
        calculation_timestamp: chrono::Local::now().to_rfc3339(),
    })
}

pub fn calculate_video_cost(req: &VideoQuoteRequest) -> Result<VideoQuote, PricingError> {
    if !(1..=10).contains(&req.count) {
        return Err(PricingError::new("Video count must be between 1 and 10", "INVALID_COUNT"));
    }
    let per_second = video_price_per_second(&req.quality).ok_or_else(|| {
        PricingError::new(format!("Unsupported quality: {}", req.quality), "INVALID_QUALITY")
    })?;
    if !(1..=30).contains(&req.duration) {
        return Err(PricingError::new(
            "Video duration must be between 1 and 30 seconds",
            "INVALID_DURATION",
        ));
    }
    let multiplier = resolution_multiplier(&req.resolution).ok_or_else(|| {
        PricingError::new(
            format!("Unsupported resolution: {}", req.resolution),
            "INVALID_RESOLUTION",
        )
    })?;

    let unit_price = per_second * Decimal::from(req.duration) * multiplier;
    let subtotal = unit_price * Decimal::from(req.count);
    let tax_amount = subtotal * tax_rate();
    let total = subtotal + tax_amount;

    Ok(Quote {
        success: true,
        cost_breakdown: CostBreakdown {
            unit_price: format_usd(unit_price),
            subtotal: format_usd(subtotal),
            discount_rate: 0.0,
            discount_amount: format_usd(Decimal::ZERO),
            discounted_price: None,
            tax_rate: percent(tax_rate()),
            tax_amount: format_usd(tax_amount),
            total: format_usd(total),
        },
        parameters: VideoQuoteParameters {
            count: req.count,
            quality: req.quality.clone(),
            duration: req.duration,
            resolution: req.resolution.clone(),
            base_price_per_second: format_usd(per_second),
            resolution_multiplier: multiplier.to_f64().unwrap_or(1.0),
            estimated_time_seconds: req.duration * req.count * 30,
        },
        model_info: ModelInfo {
            service: "Veo",
            provider: "Google Vertex AI",
            pricing_model: "per_second_with_resolution_tiers",
        },
        currency: CURRENCY,
        calculation_timestamp: chrono::Local::now().to_rfc3339(),
    })
}

/// The published price tables.
pub fn pricing_tiers() -> serde_json::Value {
    let image = |quality: &str, description: &str, features: [&str; 3]| {
        serde_json::json!({
            "price": format_usd(imagen_base_price(quality).unwrap_or_default()),
            "description": description,
            "features": features,
        })
    };
    let video = |quality: &str, description: &str, features: [&str; 3]| {
        serde_json::json!({
            "price_per_second": format_usd(video_price_per_second(quality).unwrap_or_default()),
            "description": description,
            "features": features,
        })
    };

    serde_json::json!({
        "image_pricing": {
            "standard": image("standard", "Standard quality, fast generation",
                ["Base resolution", "Faster generation", "Good for previews"]),
            "high": image("high", "High quality, balanced speed",
                ["High resolution", "Moderate generation time", "Commercial quality"]),
            "ultra": image("ultra", "Ultra quality, professional results",
                ["Very high resolution", "Longer generation time", "Professional quality"]),
        },
        "video_pricing": {
            "standard": video("standard", "Standard quality video",
                ["720p resolution", "Base quality", "Fast generation"]),
            "high": video("high", "High quality video",
                ["1080p resolution", "High quality", "Moderate generation time"]),
            "ultra": video("ultra", "Ultra quality video",
                ["4K resolution", "Professional quality", "Longer generation time"]),
        },
        "bulk_discounts": BULK_DISCOUNTS
            .iter()
            .rev()
            .map(|(min, pct)| serde_json::json!({"min_items": min, "discount": format!("{}%", pct)}))
            .collect::<Vec<_>>(),
        "currency": CURRENCY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_request(count: i64, quality: &str, size: &str, model: &str) -> ImageQuoteRequest {
        ImageQuoteRequest {
            count,
            quality: quality.into(),
            size: size.into(),
            model: model.into(),
        }
    }

    #[test]
    fn test_format_rounds_half_up() {
        assert_eq!(format_usd(Decimal::new(1005, 3)), "$1.01");
        assert_eq!(format_usd(Decimal::new(1004, 3)), "$1.00");
        assert_eq!(format_usd(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn test_bulk_discount_tiers() {
        assert_eq!(bulk_discount(4), Decimal::ZERO);
        assert_eq!(bulk_discount(5), Decimal::new(5, 2));
        assert_eq!(bulk_discount(19), Decimal::new(10, 2));
        assert_eq!(bulk_discount(50), Decimal::new(20, 2));
    }

    #[test]
    fn test_dalle_hd_portrait_quote() {
        let quote = calculate_image_cost(&image_request(2, "hd", "1024x1792", "dall-e-3")).unwrap();
        let cost = &quote.cost_breakdown;
        assert_eq!(cost.unit_price, "$0.12");
        assert_eq!(cost.subtotal, "$0.24");
        assert_eq!(cost.discount_rate, 0.0);
        assert_eq!(cost.tax_rate, 8.0);
        assert_eq!(cost.tax_amount, "$0.02");
        assert_eq!(cost.total, "$0.26");
        assert_eq!(quote.parameters.processing_batches, 2);
        assert_eq!(quote.parameters.estimated_time_seconds, 40);
        assert_eq!(quote.model_info.provider, "OpenAI");
    }

    #[test]
    fn test_imagen_bulk_quote() {
        let quote = calculate_image_cost(&image_request(10, "ultra", "1792x1024", "imagen-4")).unwrap();
        let cost = &quote.cost_breakdown;
        // 0.12 * 1.75 = 0.21 each
        assert_eq!(cost.unit_price, "$0.21");
        assert_eq!(cost.subtotal, "$2.10");
        assert_eq!(cost.discount_rate, 10.0);
        assert_eq!(cost.discount_amount, "$0.21");
        assert_eq!(cost.discounted_price.as_deref(), Some("$1.89"));
        assert_eq!(cost.total, "$2.04");
        assert_eq!(quote.parameters.processing_batches, 3);
        assert_eq!(quote.parameters.estimated_time_seconds, 45);
    }

    #[test]
    fn test_image_validation_collects_errors() {
        let err = calculate_image_cost(&image_request(5, "ultra", "800x600", "dall-e-3")).unwrap_err();
        assert_eq!(err.error_code, "INVALID_PARAMS");
        assert_eq!(err.error.matches("; ").count(), 2);

        let err = calculate_image_cost(&image_request(51, "standard", "1024x1024", "imagen")).unwrap_err();
        assert!(err.error.contains("50"));
    }

    #[test]
    fn test_video_quote() {
        let req = VideoQuoteRequest {
            count: 2,
            quality: "high".into(),
            duration: 8,
            resolution: "1080p".into(),
        };
        let quote = calculate_video_cost(&req).unwrap();
        assert_eq!(quote.cost_breakdown.unit_price, "$12.00");
        assert_eq!(quote.cost_breakdown.subtotal, "$24.00");
        assert_eq!(quote.cost_breakdown.total, "$25.92");
        assert!(quote.cost_breakdown.discounted_price.is_none());
        assert_eq!(quote.parameters.resolution_multiplier, 1.5);
        assert_eq!(quote.parameters.estimated_time_seconds, 480);
    }

    #[test]
    fn test_video_validation_codes() {
        let mut req = VideoQuoteRequest {
            count: 11,
            quality: "standard".into(),
            duration: 5,
            resolution: "720p".into(),
        };
        assert_eq!(calculate_video_cost(&req).unwrap_err().error_code, "INVALID_COUNT");
        req.count = 1;
        req.quality = "hd".into();
        assert_eq!(calculate_video_cost(&req).unwrap_err().error_code, "INVALID_QUALITY");
        req.quality = "ultra".into();
        req.duration = 31;
        assert_eq!(calculate_video_cost(&req).unwrap_err().error_code, "INVALID_DURATION");
        req.duration = 30;
        req.resolution = "8k".into();
        assert_eq!(calculate_video_cost(&req).unwrap_err().error_code, "INVALID_RESOLUTION");
    }

    #[test]
    fn test_pricing_tiers_shape() {
        let tiers = pricing_tiers();
        assert_eq!(tiers["image_pricing"]["high"]["price"], "$0.08");
        assert_eq!(tiers["video_pricing"]["ultra"]["price_per_second"], "$2.00");
        assert_eq!(tiers["bulk_discounts"][0]["min_items"], 5);
        assert_eq!(tiers["bulk_discounts"][3]["discount"], "20%");
    }
}
