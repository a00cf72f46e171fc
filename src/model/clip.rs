use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip;
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use image::imageops::FilterType;
use log::{debug, info};
use tokenizers::Tokenizer;

use super::ImageTextModel;
use crate::config::ModelOptions;
use crate::{Error, Result};

const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const CLIP_STD: [f32; 3] = [0.26862954, 0.2613026, 0.2757771];

/// 基于 candle 的 CLIP ViT-B/32
pub struct ClipEngine {
    model: clip::ClipModel,
    tokenizer: Tokenizer,
    device: Device,
    image_size: usize,
    max_len: usize,
    pad_id: u32,
}

impl ClipEngine {
    /// 加载模型权重与分词器，本地未指定时从 Hugging Face 下载
    pub fn load(opts: &ModelOptions) -> Result<Self> {
        let device = if opts.cpu { Device::Cpu } else { Device::cuda_if_available(0)? };
        info!("加载 CLIP 模型: {} ({:?})", opts.model_id, device);

        let repo = || -> Result<_> {
            let api = Api::new()?;
            Ok(api.repo(Repo::with_revision(
                opts.model_id.clone(),
                RepoType::Model,
                opts.revision.clone(),
            )))
        };
        let weights = match &opts.weights {
            Some(path) => path.clone(),
            None => repo()?.get("model.safetensors")?,
        };
        let tokenizer = match &opts.tokenizer {
            Some(path) => path.clone(),
            None => repo()?.get("tokenizer.json")?,
        };
        debug!("模型权重: {}", weights.display());
        debug!("分词器: {}", tokenizer.display());

        let tokenizer =
            Tokenizer::from_file(tokenizer).map_err(|e| Error::Tokenizer(e.to_string()))?;
        let pad_id = *tokenizer
            .get_vocab(true)
            .get("<|endoftext|>")
            .ok_or_else(|| Error::Tokenizer("分词器缺少 <|endoftext|>".to_string()))?;

        let config = clip::ClipConfig::vit_base_patch32();
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model = clip::ClipModel::new(vb, &config)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            image_size: config.image_size,
            max_len: config.text_config.max_position_embeddings,
            pad_id,
        })
    }

    /// 将文本编码为等长的 token 批次，短的用 `<|endoftext|>` 补齐
    fn tokenize(&self, texts: &[&str]) -> Result<Tensor> {
        let mut tokens = texts
            .iter()
            .map(|text| {
                let encoding =
                    self.tokenizer.encode(*text, true).map_err(|e| Error::Tokenizer(e.to_string()))?;
                Ok(truncate_ids(encoding.get_ids().to_vec(), self.max_len, self.pad_id))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = tokens.iter().map(Vec::len).max().unwrap_or(0);
        for ids in tokens.iter_mut() {
            ids.resize(max_len, self.pad_id);
        }

        Ok(Tensor::new(tokens, &self.device)?)
    }
}

impl ImageTextModel for ClipEngine {
    fn preprocess(&self, path: &Path) -> Result<Tensor> {
        let img = image::ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let size = self.image_size;
        let img = img
            .resize_to_fill(size as u32, size as u32, FilterType::Triangle)
            .to_rgb8()
            .into_raw();

        let mean = Tensor::new(&CLIP_MEAN, &Device::Cpu)?.reshape((3, 1, 1))?;
        let std = Tensor::new(&CLIP_STD, &Device::Cpu)?.reshape((3, 1, 1))?;
        let img = Tensor::from_vec(img, (size, size, 3), &Device::Cpu)?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?
            .affine(1. / 255., 0.)?
            .broadcast_sub(&mean)?
            .broadcast_div(&std)?;

        Ok(img)
    }

    fn logits_per_image(&self, images: &Tensor, texts: &[&str]) -> Result<Tensor> {
        let input_ids = self.tokenize(texts)?;
        let images = images.to_device(&self.device)?;
        let (_, logits_per_image) = self.model.forward(&images, &input_ids)?;
        Ok(logits_per_image)
    }
}

/// 截断到 `max_len`，过长时保留结尾的 `<|endoftext|>`
fn truncate_ids(mut ids: Vec<u32>, max_len: usize, eos_id: u32) -> Vec<u32> {
    if ids.len() > max_len && max_len > 0 {
        ids.truncate(max_len - 1);
        ids.push(eos_id);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::truncate_ids;

    #[test]
    fn long_text_keeps_eos() {
        let ids = (0..100).chain([49407]).collect::<Vec<u32>>();
        let ids = truncate_ids(ids, 77, 49407);
        assert_eq!(ids.len(), 77);
        assert_eq!(ids[75], 75);
        assert_eq!(ids[76], 49407);
    }

    #[test]
    fn short_text_untouched() {
        assert_eq!(truncate_ids(vec![49406, 1, 49407], 77, 49407), [49406, 1, 49407]);
    }
}
