use crate::models::prompt::ContentType;
use axum::{extract::Query, response::Json, routing::get, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn tips_routes() -> Router {
    Router::new().route("/api/prompt-tips", get(prompt_tips))
}

#[derive(Debug, Deserialize)]
pub struct TipsQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

pub fn tips_for(content_type: ContentType) -> Value {
    match content_type {
        ContentType::Image => json!({
            "characters": [
                "young woman with long flowing hair",
                "middle-aged man with a friendly smile",
                "cute child with an innocent expression",
                "elderly person with a kind face"
            ],
            "backgrounds": [
                "natural landscape with mountains and rivers",
                "city street at night, bustling lights",
                "cosy indoor home scene",
                "seaside sunset, romantic atmosphere"
            ],
            "photography": [
                "shallow depth of field, blurred background",
                "wide-angle lens, panoramic shot",
                "macro photography, fine detail",
                "backlit shot, crisp silhouette"
            ],
            "styles": [
                "realistic style, rich detail",
                "artistic style, creative expression",
                "vintage style, nostalgic tones",
                "futuristic style, strong sci-fi feel"
            ]
        }),
        ContentType::Video => json!({
            "actions": [
                "person walking with a natural gait",
                "waving hello in a friendly way",
                "jumping, full of energy",
                "dancing with graceful, fluid motion"
            ],
            "camera_movements": [
                "slow push in on the subject",
                "pull back to reveal the whole scene",
                "pan left and right following the action",
                "tilt up and down to change perspective"
            ],
            "environments": [
                "nature with grass moving in the wind",
                "city with heavy traffic",
                "interior with shifting light and shadow",
                "underwater with shimmering light"
            ],
            "effects": [
                "slow motion to show fine detail",
                "fast motion for a strong rhythm",
                "rack focus between subjects",
                "colour grade shift to set the mood"
            ]
        }),
    }
}

async fn prompt_tips(Query(query): Query<TipsQuery>) -> Json<Value> {
    // anything other than "image" gets the video tips
    let content_type = match query.content_type.as_deref().map(ContentType::parse) {
        None | Some(Some(ContentType::Image)) => ContentType::Image,
        _ => ContentType::Video,
    };

    Json(json!({
        "type": content_type.as_str(),
        "tips": tips_for(content_type),
    }))
}
