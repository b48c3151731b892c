//! Encoder invocation assembly.
//!
//! Folds extracted sources and overlay fragments into the single FFmpeg
//! command that renders the whole timeline: a black base canvas sized to
//! the output, each visual source overlaid inside its timeline window,
//! sticker and text overlays on top, and all audio delayed to position
//! and mixed.

use std::path::Path;

use crate::encoder::{EncoderInvocation, ExportSettings};
use crate::error::ExportResult;
use crate::extract::SourceInput;
use crate::filters::{build_drawtext_filter, build_sticker_chain, FontResolver};
use crate::timeline::{StickerPlacement, TextElementData};
use crate::types::TimeSec;

/// Duration rendered for a timeline with no visible elements.
const BLANK_CLIP_DURATION: TimeSec = 1.0;

/// Encoder-side configuration that differs between engine tiers.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EncoderConfig {
    /// FFmpeg video encoder name (libx264 or a hardware encoder)
    pub video_codec: String,
    /// Explicit `-threads` bound (None = encoder default)
    pub threads: Option<usize>,
    /// Whether preset/CRF quality args apply (software x264 only;
    /// hardware encoders are bitrate-driven)
    pub quality_args: bool,
}

/// A sticker source paired with its canvas placement.
#[derive(Clone, Debug)]
pub(crate) struct StickerSource {
    pub input: SourceInput,
    pub placement: StickerPlacement,
}

/// A text overlay with its visibility window.
#[derive(Clone, Debug)]
pub(crate) struct TextOverlay {
    pub data: TextElementData,
    pub start: TimeSec,
    pub end: TimeSec,
}

/// Everything the runner needs to drive one export.
#[derive(Clone, Debug)]
pub(crate) struct InvocationPlan {
    pub invocation: EncoderInvocation,
    pub total_duration: TimeSec,
    pub total_frames: u64,
}

/// All extracted material for one export, already sorted by start time.
#[derive(Clone, Debug, Default)]
pub(crate) struct ExportMaterial {
    pub videos: Vec<SourceInput>,
    pub images: Vec<SourceInput>,
    pub audios: Vec<SourceInput>,
    pub stickers: Vec<StickerSource>,
    pub texts: Vec<TextOverlay>,
}

impl ExportMaterial {
    fn is_empty(&self) -> bool {
        self.videos.is_empty()
            && self.images.is_empty()
            && self.audios.is_empty()
            && self.stickers.is_empty()
            && self.texts.is_empty()
    }

    /// Latest end time of any material, the render duration.
    fn duration(&self) -> TimeSec {
        let visual = self
            .videos
            .iter()
            .chain(self.images.iter())
            .chain(self.stickers.iter().map(|s| &s.input))
            .map(|s| s.start_time + s.effective_duration());
        let text = self.texts.iter().map(|t| t.end);
        let audio = self
            .audios
            .iter()
            .map(|s| s.start_time + s.effective_duration());

        visual.chain(text).chain(audio).fold(0.0, f64::max)
    }
}

/// Assemble the full encoder invocation for one export.
pub(crate) fn build_export_invocation(
    ffmpeg_path: &Path,
    material: &ExportMaterial,
    settings: &ExportSettings,
    config: &EncoderConfig,
    fonts: &FontResolver,
) -> ExportResult<InvocationPlan> {
    settings.validate()?;

    let total_duration = if material.is_empty() {
        BLANK_CLIP_DURATION
    } else {
        material.duration().max(0.01)
    };

    let mut args: Vec<String> = Vec::new();
    let mut filter = String::new();

    // Input 0: black base canvas covering the whole render.
    args.extend([
        "-f".to_string(),
        "lavfi".to_string(),
        "-t".to_string(),
        format!("{:.3}", total_duration),
        "-i".to_string(),
        format!(
            "color=c=black:s={}x{}:r={}",
            settings.width, settings.height, settings.fps
        ),
    ]);
    let mut next_input = 1usize;

    // Visual clips and stills, merged in start-time order so stacking is
    // deterministic (ties: clips before stills).
    let visuals = merge_visuals(&material.videos, &material.images);
    let mut visual_indices = Vec::with_capacity(visuals.len());
    for (source, is_image) in &visuals {
        if *is_image {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-t".to_string(),
                format!("{:.3}", source.effective_duration()),
                "-i".to_string(),
                source.path.to_string_lossy().to_string(),
            ]);
        } else {
            args.extend([
                "-ss".to_string(),
                format!("{:.3}", source.trim_start),
                "-t".to_string(),
                format!("{:.3}", source.effective_duration()),
                "-i".to_string(),
                source.path.to_string_lossy().to_string(),
            ]);
        }
        visual_indices.push(next_input);
        next_input += 1;
    }

    let mut sticker_indices = Vec::with_capacity(material.stickers.len());
    for sticker in &material.stickers {
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-t".to_string(),
            format!("{:.3}", sticker.input.effective_duration()),
            "-i".to_string(),
            sticker.input.path.to_string_lossy().to_string(),
        ]);
        sticker_indices.push(next_input);
        next_input += 1;
    }

    let mut audio_indices = Vec::with_capacity(material.audios.len());
    for audio in &material.audios {
        args.extend(["-i".to_string(), audio.path.to_string_lossy().to_string()]);
        audio_indices.push(next_input);
        next_input += 1;
    }

    // Silent bed when no audio material exists.
    let silence_index = if material.audios.is_empty() {
        args.extend([
            "-f".to_string(),
            "lavfi".to_string(),
            "-t".to_string(),
            format!("{:.3}", total_duration),
            "-i".to_string(),
            "anullsrc=channel_layout=stereo:sample_rate=44100".to_string(),
        ]);
        Some(next_input)
    } else {
        None
    };

    // ---- Video graph ----
    let mut current = "0:v".to_string();
    for (k, ((source, _), input_idx)) in visuals.iter().zip(&visual_indices).enumerate() {
        let start = source.start_time;
        let end = start + source.effective_duration();

        filter.push_str(&format!(
            "[{idx}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setpts=PTS-STARTPTS+{start:.3}/TB[sc{k}];",
            idx = input_idx,
            w = settings.width,
            h = settings.height,
            start = start,
            k = k,
        ));
        filter.push_str(&format!(
            "[{cur}][sc{k}]overlay=0:0:eof_action=pass:enable='between(t,{start:.3},{end:.3})'[v{k}];",
            cur = current,
            k = k,
            start = start,
            end = end,
        ));
        current = format!("v{}", k);
    }

    for (k, (sticker, input_idx)) in material.stickers.iter().zip(&sticker_indices).enumerate() {
        let start = sticker.input.start_time;
        let end = start + sticker.input.effective_duration();
        let out = format!("s{}", k);
        filter.push_str(&build_sticker_chain(
            *input_idx,
            &current,
            &out,
            &sticker.placement,
            start,
            end,
        ));
        filter.push(';');
        current = out;
    }

    for (k, text) in material.texts.iter().enumerate() {
        let body = build_drawtext_filter(&text.data, text.start, text.end, fonts);
        filter.push_str(&format!("[{}]{}[t{}];", current, body, k));
        current = format!("t{}", k);
    }

    filter.push_str(&format!("[{}]format=yuv420p[outv]", current));

    // ---- Audio graph ----
    filter.push(';');
    if let Some(idx) = silence_index {
        filter.push_str(&format!("[{}:a]anull[outa]", idx));
    } else {
        let mut labels = Vec::with_capacity(material.audios.len());
        for (k, (audio, input_idx)) in material.audios.iter().zip(&audio_indices).enumerate() {
            let delay_ms = (audio.start_time * 1000.0).round() as u64;
            let mut chain = format!(
                "[{idx}:a]atrim=start={ts:.3}:duration={dur:.3},asetpts=PTS-STARTPTS",
                idx = input_idx,
                ts = audio.trim_start,
                dur = audio.effective_duration(),
            );
            if let Some(volume) = audio.volume {
                chain.push_str(&format!(",volume={:.3}", volume));
            }
            chain.push_str(&format!(",adelay={ms}|{ms}[aud{k}];", ms = delay_ms, k = k));
            filter.push_str(&chain);
            labels.push(format!("[aud{}]", k));
        }

        if labels.len() == 1 {
            filter.push_str(&format!("{}anull[outa]", labels[0]));
        } else {
            filter.push_str(&labels.join(""));
            filter.push_str(&format!("amix=inputs={}:normalize=0[outa]", labels.len()));
        }
    }

    args.extend(["-filter_complex".to_string(), filter]);
    args.extend(["-map".to_string(), "[outv]".to_string()]);
    args.extend(["-map".to_string(), "[outa]".to_string()]);

    args.extend(["-c:v".to_string(), config.video_codec.clone()]);
    if config.quality_args {
        args.extend(["-preset".to_string(), settings.speed_preset.clone()]);
        if let Some(crf) = settings.crf {
            args.extend(["-crf".to_string(), crf.to_string()]);
        }
    }
    args.extend(["-b:v".to_string(), settings.video_bitrate.clone()]);
    args.extend(["-c:a".to_string(), "aac".to_string()]);
    args.extend(["-b:a".to_string(), settings.audio_bitrate.clone()]);
    args.extend(["-r".to_string(), settings.fps.to_string()]);
    if let Some(threads) = config.threads {
        args.extend(["-threads".to_string(), threads.to_string()]);
    }
    args.extend(["-t".to_string(), format!("{:.3}", total_duration)]);
    args.push("-y".to_string());
    args.push(settings.output_path.to_string_lossy().to_string());

    let total_frames = (total_duration * settings.fps).round() as u64;

    Ok(InvocationPlan {
        invocation: EncoderInvocation {
            program: ffmpeg_path.to_path_buf(),
            args,
        },
        total_duration,
        total_frames,
    })
}

/// Merge clip and still sources into one start-ordered visual list.
fn merge_visuals<'a>(
    videos: &'a [SourceInput],
    images: &'a [SourceInput],
) -> Vec<(&'a SourceInput, bool)> {
    let mut visuals: Vec<(&SourceInput, bool)> = videos
        .iter()
        .map(|v| (v, false))
        .chain(images.iter().map(|i| (i, true)))
        .collect();
    visuals.sort_by(|a, b| {
        a.0.start_time
            .partial_cmp(&b.0.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    visuals
}
