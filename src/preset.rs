// Presets: a built-in txt2img workflow, filled in from a handful of generation parameters.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::workflow::{self, Graph, IdGenerator, InputValue, NodeLink, NodeMeta};

// Node keys within the template.
const CHECKPOINT: &str = "1";
const SAMPLER: &str = "2";
const CLIP_LAST_LAYER: &str = "3";
const POSITIVE: &str = "4";
const NEGATIVE: &str = "5";
const LATENT: &str = "6";
// LoRA nodes are numbered from here.
const FIRST_LORA: u32 = 9;

// Largest integer a JSON number survives on the client side.
const MAX_SAFE_SEED: u64 = (1 << 53) - 1;

const TXT2IMG_TEMPLATE: &str = r#"{
  "1": {
    "inputs": { "ckpt_name": "" },
    "class_type": "CheckpointLoaderSimple",
    "_meta": { "title": "Checkpoint Loader (Simple)" }
  },
  "2": {
    "inputs": {
      "seed": 0,
      "steps": 20,
      "cfg": 8,
      "sampler_name": "euler",
      "scheduler": "normal",
      "denoise": 1,
      "model": ["1", 0],
      "positive": ["4", 0],
      "negative": ["5", 0],
      "latent_image": ["6", 0]
    },
    "class_type": "KSampler",
    "_meta": { "title": "KSampler" }
  },
  "3": {
    "inputs": { "stop_at_clip_layer": -2, "clip": ["1", 1] },
    "class_type": "CLIPSetLastLayer",
    "_meta": { "title": "Set CLIP Last Layer" }
  },
  "4": {
    "inputs": { "text": "", "clip": ["3", 0] },
    "class_type": "CLIPTextEncode",
    "_meta": { "title": "CLIP Text Encode" }
  },
  "5": {
    "inputs": { "text": "", "clip": ["3", 0] },
    "class_type": "CLIPTextEncode",
    "_meta": { "title": "CLIP Text Encode" }
  },
  "6": {
    "inputs": { "width": 512, "height": 512, "batch_size": 1 },
    "class_type": "EmptyLatentImage",
    "_meta": { "title": "Empty Latent Image" }
  },
  "7": {
    "inputs": { "samples": ["2", 0], "vae": ["1", 2] },
    "class_type": "VAEDecode",
    "_meta": { "title": "VAE Decode" }
  },
  "8": {
    "inputs": { "images": ["7", 0] },
    "class_type": "PreviewImage",
    "_meta": { "title": "Preview Image" }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraConfig {
    pub name: String,
    #[serde(default = "one")]
    pub strength_model: f64,
    #[serde(default = "one")]
    pub strength_clip: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub model: String,
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub steps: u32,
    pub cfg: f64,
    pub seed: u64,
    pub use_random_seed: bool,
    pub width: u32,
    pub height: u32,
    pub stop_at_clip_layer: i32,
    pub sampler: String,
    pub scheduler: String,
    pub loras: Vec<LoraConfig>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "".to_string(),
            positive_prompt: "".to_string(),
            negative_prompt: "".to_string(),
            steps: 20,
            cfg: 8.0,
            seed: 0,
            use_random_seed: true,
            width: 512,
            height: 512,
            stop_at_clip_layer: -2,
            sampler: "euler".to_string(),
            scheduler: "normal".to_string(),
            loras: vec![],
        }
    }
}

/// The unfilled txt2img workflow.
pub fn default_template(ids: &mut dyn IdGenerator) -> Graph {
    workflow::parse(TXT2IMG_TEMPLATE, ids)
        .expect("built-in template must parse")
        .graph
}

fn link(node: &str, slot: u32) -> InputValue {
    InputValue::Link(NodeLink {
        node: node.to_owned(),
        slot,
    })
}

fn lora_node(lora: &LoraConfig, model: InputValue, clip: InputValue) -> BTreeMap<String, InputValue> {
    BTreeMap::from([
        ("lora_name".to_owned(), InputValue::from(lora.name.as_str())),
        ("strength_model".to_owned(), InputValue::from(lora.strength_model)),
        ("strength_clip".to_owned(), InputValue::from(lora.strength_clip)),
        ("model".to_owned(), model),
        ("clip".to_owned(), clip),
    ])
}

/// Builds a ready-to-submit workflow from generation parameters.
///
/// LoRAs are chained between the checkpoint loader and the sampler / text encoders,
/// in the order given. LoRAs with a blank name are ignored.
pub fn create_preset(params: &GenerationParams, ids: &mut dyn IdGenerator, rng: &mut impl Rng) -> Graph {
    let mut graph = default_template(ids).set_input(CHECKPOINT, "ckpt_name", params.model.as_str());

    let loras: Vec<&LoraConfig> = params.loras.iter().filter(|l| !l.name.trim().is_empty()).collect();
    if !loras.is_empty() {
        let mut last_model = CHECKPOINT.to_owned();
        let mut last_clip = (CLIP_LAST_LAYER.to_owned(), 0);
        for (i, lora) in loras.into_iter().enumerate() {
            let key = (FIRST_LORA + i as u32).to_string();
            let inputs = lora_node(lora, link(&last_model, 0), link(&last_clip.0, last_clip.1));
            graph = graph.with_node(&key, "LoraLoader", inputs, Some(NodeMeta::with_title("LoRA Loader")), ids);
            last_model = key.clone();
            last_clip = (key, 1);
        }
        graph = graph
            .set_input(SAMPLER, "model", link(&last_model, 0))
            .set_input(POSITIVE, "clip", link(&last_model, 1))
            .set_input(NEGATIVE, "clip", link(&last_model, 1));
    }

    let seed = if params.use_random_seed {
        rng.gen_range(0..MAX_SAFE_SEED)
    } else {
        params.seed
    };
    graph
        .set_input(SAMPLER, "seed", seed)
        .set_input(SAMPLER, "steps", u64::from(params.steps))
        .set_input(SAMPLER, "cfg", params.cfg)
        .set_input(SAMPLER, "sampler_name", params.sampler.as_str())
        .set_input(SAMPLER, "scheduler", params.scheduler.as_str())
        .set_input(CLIP_LAST_LAYER, "stop_at_clip_layer", i64::from(params.stop_at_clip_layer))
        .set_input(POSITIVE, "text", params.positive_prompt.as_str())
        .set_input(NEGATIVE, "text", params.negative_prompt.as_str())
        .set_input(LATENT, "width", u64::from(params.width))
        .set_input(LATENT, "height", u64::from(params.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    use crate::workflow::UuidGenerator;

    fn params() -> GenerationParams {
        GenerationParams {
            model: "anime.safetensors".to_string(),
            positive_prompt: "a cat".to_string(),
            negative_prompt: "photograph".to_string(),
            seed: 42,
            use_random_seed: false,
            ..Default::default()
        }
    }

    fn build(params: &GenerationParams) -> serde_json::Value {
        let mut rng = StdRng::seed_from_u64(0);
        create_preset(params, &mut UuidGenerator, &mut rng).to_value().unwrap()
    }

    #[test]
    fn test_template() {
        let graph = default_template(&mut UuidGenerator);
        assert_eq!(graph.len(), 8);
        assert!(graph.dangling_links().is_empty());
    }

    #[test]
    fn test_simple_txt2img() {
        let wire = build(&params());
        assert_eq!(wire["1"]["inputs"]["ckpt_name"], json!("anime.safetensors"));
        assert_eq!(wire["2"]["inputs"]["seed"], json!(42));
        assert_eq!(wire["2"]["inputs"]["model"], json!(["1", 0]));
        assert_eq!(wire["4"]["inputs"]["text"], json!("a cat"));
        assert_eq!(wire["5"]["inputs"]["text"], json!("photograph"));
        assert_eq!(wire["6"]["inputs"]["width"], json!(512));
        assert_eq!(wire.as_object().unwrap().len(), 8);
    }

    #[test]
    fn test_random_seed() {
        let wire = build(&GenerationParams {
            use_random_seed: true,
            ..params()
        });
        let seed = wire["2"]["inputs"]["seed"].as_u64().unwrap();
        assert!(seed <= MAX_SAFE_SEED);
    }

    #[test]
    fn test_lora_chain() {
        let wire = build(&GenerationParams {
            loras: vec![
                LoraConfig { name: "style.safetensors".to_string(), strength_model: 0.8, strength_clip: 1.0 },
                LoraConfig { name: "  ".to_string(), strength_model: 1.0, strength_clip: 1.0 },
                LoraConfig { name: "detail.safetensors".to_string(), strength_model: 1.0, strength_clip: 0.5 },
            ],
            ..params()
        });
        assert_eq!(wire.as_object().unwrap().len(), 10);
        assert_eq!(wire["9"]["class_type"], json!("LoraLoader"));
        assert_eq!(wire["9"]["inputs"]["model"], json!(["1", 0]));
        assert_eq!(wire["9"]["inputs"]["clip"], json!(["3", 0]));
        assert_eq!(wire["9"]["inputs"]["strength_model"], json!(0.8));
        assert_eq!(wire["10"]["inputs"]["lora_name"], json!("detail.safetensors"));
        assert_eq!(wire["10"]["inputs"]["model"], json!(["9", 0]));
        assert_eq!(wire["10"]["inputs"]["clip"], json!(["9", 1]));
        assert_eq!(wire["2"]["inputs"]["model"], json!(["10", 0]));
        assert_eq!(wire["4"]["inputs"]["clip"], json!(["10", 1]));
        assert_eq!(wire["5"]["inputs"]["clip"], json!(["10", 1]));
        assert!(wire.get("11").is_none());
    }

    #[test]
    fn test_params_from_toml() {
        let params: GenerationParams = toml::from_str(
            r#"
            model = "flux.safetensors"
            positive_prompt = "a lighthouse"
            steps = 30

            [[loras]]
            name = "style.safetensors"
            "#,
        )
        .unwrap();
        assert_eq!(params.steps, 30);
        assert_eq!(params.sampler, "euler");
        assert_eq!(params.loras[0].strength_clip, 1.0);
    }
}
