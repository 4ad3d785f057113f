// Node type dispatch.
//
// The backend's node types evolve on their own, so this is a lookup table rather than an enum.
// Anything we don't know about falls through to UNSUPPORTED, which still gets displayed and
// submitted, just not edited.

use std::collections::HashMap;

use anyhow::{bail, Result};
use lazy_static::lazy_static;
use serde_json::Value;

use crate::workflow::InputValue;

pub const SAMPLERS: &[&str] = &[
    "euler",
    "euler_cfg_pp",
    "euler_ancestral",
    "euler_ancestral_cfg_pp",
    "heun",
    "heunpp2",
    "dpm_2",
    "dpm_2_ancestral",
    "lms",
    "dpm_fast",
    "dpm_adaptive",
    "dpmpp_2s_ancestral",
    "dpmpp_2s_ancestral_cfg_pp",
    "dpmpp_sde",
    "dpmpp_sde_gpu",
    "dpmpp_2m",
    "dpmpp_2m_cfg_pp",
    "dpmpp_2m_sde",
    "dpmpp_2m_sde_gpu",
    "dpmpp_3m_sde",
    "dpmpp_3m_sde_gpu",
    "ddpm",
    "lcm",
    "ipndm",
    "ipndm_v",
    "deis",
    "res_multistep",
    "res_multistep_cfg_pp",
    "gradient_estimation",
    "ddim",
    "uni_pc",
    "uni_pc_bh2",
];

pub const SCHEDULERS: &[&str] = &[
    "normal",
    "karras",
    "exponential",
    "sgm_uniform",
    "simple",
    "ddim_uniform",
    "beta",
    "linear_quadratic",
    "kl_optimal",
];

const UPSCALE_METHODS: &[&str] = &["nearest-exact", "bilinear", "area", "bicubic", "lanczos"];

#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Text,
    /// File name from one of the backend's model folders.
    Model(&'static str),
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Seed,
    /// "enable" / "disable".
    Toggle,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub name: &'static str,
    pub kind: InputKind,
}

#[derive(Debug)]
pub struct NodeEditor {
    pub type_tag: &'static str,
    /// False only for the fallback editor.
    pub supported: bool,
    /// Inputs the editor lets the user change. Empty for display-only nodes.
    pub inputs: Vec<InputSpec>,
}

fn input(name: &'static str, kind: InputKind) -> InputSpec {
    InputSpec { name, kind }
}

fn int(min: i64, max: i64) -> InputKind {
    InputKind::Int { min, max }
}

fn float(min: f64, max: f64) -> InputKind {
    InputKind::Float { min, max }
}

pub static UNSUPPORTED: NodeEditor = NodeEditor {
    type_tag: "Unsupported",
    supported: false,
    inputs: Vec::new(),
};

lazy_static! {
    static ref EDITORS: HashMap<&'static str, NodeEditor> = {
        use InputKind::*;
        let sampler_inputs = || vec![
            input("seed", Seed),
            input("steps", int(1, 10000)),
            input("cfg", float(0.0, 100.0)),
            input("sampler_name", Choice(SAMPLERS)),
            input("scheduler", Choice(SCHEDULERS)),
            input("denoise", float(0.0, 1.0)),
        ];
        let editors = vec![
            ("CheckpointLoaderSimple", vec![input("ckpt_name", Model("checkpoints"))]),
            ("KSampler", sampler_inputs()),
            ("KSamplerAdvanced", vec![
                input("add_noise", Toggle),
                input("noise_seed", Seed),
                input("steps", int(1, 10000)),
                input("cfg", float(0.0, 100.0)),
                input("sampler_name", Choice(SAMPLERS)),
                input("scheduler", Choice(SCHEDULERS)),
                input("start_at_step", int(0, 10000)),
                input("end_at_step", int(0, 10000)),
                input("return_with_leftover_noise", Toggle),
            ]),
            ("CLIPTextEncode", vec![input("text", Text)]),
            ("CLIPTextEncodeSDXL", vec![
                input("text_g", Text),
                input("text_l", Text),
                input("width", int(0, 16384)),
                input("height", int(0, 16384)),
            ]),
            ("CLIPSetLastLayer", vec![input("stop_at_clip_layer", int(-24, -1))]),
            ("EmptyLatentImage", vec![
                input("width", int(16, 16384)),
                input("height", int(16, 16384)),
                input("batch_size", int(1, 4096)),
            ]),
            ("EmptySD3LatentImage", vec![
                input("width", int(16, 16384)),
                input("height", int(16, 16384)),
                input("batch_size", int(1, 4096)),
            ]),
            ("LoraLoader", vec![
                input("lora_name", Model("loras")),
                input("strength_model", float(-100.0, 100.0)),
                input("strength_clip", float(-100.0, 100.0)),
            ]),
            ("LoraLoaderModelOnly", vec![
                input("lora_name", Model("loras")),
                input("strength_model", float(-100.0, 100.0)),
            ]),
            ("UNETLoader", vec![input("unet_name", Model("diffusion_models"))]),
            ("VAELoader", vec![input("vae_name", Model("vae"))]),
            ("CLIPLoader", vec![input("clip_name", Model("text_encoders"))]),
            ("DualCLIPLoader", vec![
                input("clip_name1", Model("text_encoders")),
                input("clip_name2", Model("text_encoders")),
            ]),
            ("CLIPVisionLoader", vec![input("clip_name", Model("clip_vision"))]),
            ("FluxGuidance", vec![input("guidance", float(0.0, 100.0))]),
            ("ModelSamplingFlux", vec![
                input("max_shift", float(0.0, 100.0)),
                input("base_shift", float(0.0, 100.0)),
                input("width", int(16, 16384)),
                input("height", int(16, 16384)),
            ]),
            ("ModelSamplingSD3", vec![input("shift", float(0.0, 100.0))]),
            ("RandomNoise", vec![input("noise_seed", Seed)]),
            ("KSamplerSelect", vec![input("sampler_name", Choice(SAMPLERS))]),
            ("BasicScheduler", vec![
                input("scheduler", Choice(SCHEDULERS)),
                input("steps", int(1, 10000)),
                input("denoise", float(0.0, 1.0)),
            ]),
            ("ImageScale", vec![
                input("upscale_method", Choice(UPSCALE_METHODS)),
                input("width", int(0, 16384)),
                input("height", int(0, 16384)),
            ]),
            ("ImageScaleBy", vec![
                input("upscale_method", Choice(UPSCALE_METHODS)),
                input("scale_by", float(0.01, 8.0)),
            ]),
            ("ImagePadForOutpaint", vec![
                input("left", int(0, 16384)),
                input("top", int(0, 16384)),
                input("right", int(0, 16384)),
                input("bottom", int(0, 16384)),
                input("feathering", int(0, 16384)),
            ]),
            ("VAEEncodeForInpaint", vec![input("grow_mask_by", int(0, 64))]),
            ("LoadImage", vec![input("image", Text)]),
            ("SaveImage", vec![input("filename_prefix", Text)]),
            ("PrimitiveStringMultiline", vec![input("value", Text)]),
            // Shown, but nothing to edit.
            ("VAEDecode", vec![]),
            ("VAEEncode", vec![]),
            ("PreviewImage", vec![]),
            ("BasicGuider", vec![]),
            ("SamplerCustomAdvanced", vec![]),
            ("CLIPVisionEncode", vec![]),
            ("GetImageSize", vec![]),
        ];
        editors
            .into_iter()
            .map(|(type_tag, inputs)| (type_tag, NodeEditor { type_tag, supported: true, inputs }))
            .collect()
    };
}

/// Returns the editor for a node type. Unknown types get UNSUPPORTED.
pub fn editor_for(type_tag: &str) -> &'static NodeEditor {
    EDITORS.get(type_tag).unwrap_or(&UNSUPPORTED)
}

pub fn is_supported(type_tag: &str) -> bool {
    editor_for(type_tag).supported
}

impl NodeEditor {
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|spec| spec.name == name)
    }

    pub fn is_read_only(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The backend model folder `name` picks from, if it is a model input.
    pub fn model_folder(&self, name: &str) -> Option<&'static str> {
        match self.input(name)?.kind {
            InputKind::Model(folder) => Some(folder),
            _ => None,
        }
    }

    /// Checks a value the user wants to assign to `name`.
    /// Inputs the editor doesn't know about, and links, are let through.
    pub fn validate(&self, name: &str, value: &InputValue) -> Result<()> {
        let (Some(spec), InputValue::Literal(value)) = (self.input(name), value) else {
            return Ok(());
        };
        match &spec.kind {
            InputKind::Text | InputKind::Model(_) => {
                if !value.is_string() {
                    bail!("{} must be a string", name);
                }
            }
            InputKind::Int { min, max } => match value.as_i64() {
                Some(n) if (*min..=*max).contains(&n) => {}
                _ => bail!("{} must be an integer between {} and {}", name, min, max),
            },
            InputKind::Float { min, max } => match value.as_f64() {
                Some(x) if (*min..=*max).contains(&x) => {}
                _ => bail!("{} must be a number between {} and {}", name, min, max),
            },
            InputKind::Seed => {
                if value.as_u64().is_none() {
                    bail!("{} must be a non-negative integer", name);
                }
            }
            InputKind::Toggle => match value.as_str() {
                Some("enable") | Some("disable") => {}
                _ => bail!("{} must be \"enable\" or \"disable\"", name),
            },
            InputKind::Choice(options) => {
                let choice = value.as_str().unwrap_or_default();
                if !options.contains(&choice) {
                    match closest(choice, options.iter().copied()) {
                        Some(best) => bail!("Unknown {}: {}. Did you mean {}?", name, describe(value), best),
                        None => bail!("Unknown {}: {}", name, describe(value)),
                    }
                }
            }
        }
        Ok(())
    }
}

/// Checks a model input against the files the backend has in its folder.
pub fn validate_model(name: &str, value: &InputValue, models: &[String]) -> Result<()> {
    let InputValue::Literal(Value::String(model)) = value else {
        return Ok(());
    };
    if models.iter().any(|m| m == model) {
        return Ok(());
    }
    match closest(model, models.iter().map(String::as_str)) {
        Some(best) => bail!("Unknown {}: {}. Did you mean {}?", name, model, best),
        None => bail!("Unknown {}: {}", name, model),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn closest<'a>(target: &str, options: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    options
        .into_iter()
        .map(|option| (strsim::levenshtein(target, option), option))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= 3)
        .map(|(_, option)| option)
}
