//! Frame sequences rendered at shrinking step sizes, plus the ffmpeg concat
//! playlist that strings them into an animation.

use crate::render::render;
use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use log::info;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    /// Trajectories over [-8, 8] for 27 steps from 1 down to 2^-13.
    Standard,
    /// Deviation from the reference over [x0, 2] for steps 1/2 .. 1/64.
    Delta,
}

impl FromStr for Animation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Animation::Standard),
            "delta" => Ok(Animation::Delta),
            other => bail!("unknown animation \"{other}\"; expected standard or delta"),
        }
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub step: f64,
    pub file_name: String,
}

impl Animation {
    pub fn name(self) -> &'static str {
        match self {
            Animation::Standard => "standard",
            Animation::Delta => "delta",
        }
    }

    pub fn playlist_name(self) -> String {
        format!("ffmpeg_list-{}.txt", self.name())
    }

    fn steps(self) -> Vec<f64> {
        match self {
            Animation::Standard => (0..27).map(|k| 2f64.powf(-0.5 * k as f64)).collect(),
            Animation::Delta => (1..7).map(|k| 2f64.powi(-k)).collect(),
        }
    }

    fn frame_duration(self) -> f64 {
        match self {
            Animation::Standard => 0.1,
            Animation::Delta => 1.0,
        }
    }

    /// Frames in playback order, coarsest step first.
    pub fn frames(self) -> Vec<Frame> {
        self.steps()
            .into_iter()
            .map(|step| Frame {
                step,
                file_name: format!("{}-{:.6}-h.png", self.name(), step),
            })
            .collect()
    }

    /// Settings used for every frame of this animation.
    pub fn settings(self, base: &Settings) -> Settings {
        let mut settings = base.clone();
        match self {
            Animation::Standard => settings.x_range = [-8.0, 8.0],
            Animation::Delta => settings.x_range[1] = 2.0,
        }
        settings
    }

    /// ffconcat playlist that plays the frames forward, then back down
    /// without repeating the two ends.
    pub fn playlist(self, frames: &[Frame]) -> String {
        let duration = self.frame_duration();
        let inner = frames.len().saturating_sub(1);
        let order = frames
            .iter()
            .chain(frames.iter().take(inner).skip(1).rev());

        let mut out = String::from("ffconcat version 1.0  \n");
        for frame in order {
            out.push_str(&format!("file '{}' \n", frame.file_name));
            out.push_str(&format!("duration {duration:?}\n"));
        }
        if self == Animation::Delta {
            if let Some(first) = frames.first() {
                out.push_str(&format!("file '{}' \n", first.file_name));
                out.push_str("duration 0.01\n");
            }
        }
        out
    }
}

/// Renders every frame of `animation` into `dir` and writes its playlist.
pub fn animate(base: &Settings, animation: Animation, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let settings = animation.settings(base);
    let delta = animation == Animation::Delta;
    let frames = animation.frames();

    for (i, frame) in frames.iter().enumerate().rev() {
        info!(
            "{animation} frame {}/{}: step {:.6}",
            frames.len() - i,
            frames.len(),
            frame.step
        );
        render(&settings, frame.step, delta, &dir.join(&frame.file_name))
            .with_context(|| format!("failed to render {}", frame.file_name))?;
    }

    let playlist = dir.join(animation.playlist_name());
    fs::write(&playlist, animation.playlist(&frames))
        .with_context(|| format!("failed to write {}", playlist.display()))?;
    info!("wrote {}", playlist.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!("standard".parse::<Animation>().expect("standard"), Animation::Standard);
        assert_eq!(" Delta ".parse::<Animation>().expect("delta"), Animation::Delta);
        let err = "spin".parse::<Animation>().expect_err("spin");
        assert!(err.to_string().contains("unknown animation"));
    }

    #[test]
    fn standard_frames_halve_every_two_steps() {
        let frames = Animation::Standard.frames();
        assert_eq!(frames.len(), 27);
        assert_eq!(frames[0].file_name, "standard-1.000000-h.png");
        assert_eq!(frames[2].file_name, "standard-0.500000-h.png");
        assert_eq!(frames[26].file_name, "standard-0.000122-h.png");
    }

    #[test]
    fn delta_frames_start_at_one_half() {
        let names: Vec<String> = Animation::Delta
            .frames()
            .into_iter()
            .map(|f| f.file_name)
            .collect();
        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "delta-0.500000-h.png");
        assert_eq!(names[5], "delta-0.015625-h.png");
    }

    #[test]
    fn frame_settings_override_range() {
        let base = Settings::default();
        assert_eq!(Animation::Standard.settings(&base).x_range, [-8.0, 8.0]);
        assert_eq!(Animation::Delta.settings(&base).x_range, [0.0, 2.0]);
    }

    #[test]
    fn playlist_bounces_between_ends() {
        let frames: Vec<Frame> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| Frame {
                step: 1.0,
                file_name: name.to_string(),
            })
            .collect();

        let standard = Animation::Standard.playlist(&frames);
        let files: Vec<&str> = standard
            .lines()
            .filter_map(|line| line.strip_prefix("file '"))
            .map(|rest| rest.trim_end_matches("' "))
            .collect();
        assert_eq!(files, vec!["a", "b", "c", "d", "c", "b"]);
        assert!(standard.starts_with("ffconcat version 1.0  \n"));
        assert!(standard.lines().filter(|l| l.starts_with("duration")).all(|l| l == "duration 0.1"));

        let delta = Animation::Delta.playlist(&frames);
        assert!(delta.contains("duration 1.0\n"));
        assert!(delta.ends_with("file 'a' \nduration 0.01\n"));
    }

    #[test]
    fn short_playlists_do_not_repeat() {
        let frames = vec![Frame {
            step: 0.5,
            file_name: "only.png".to_string(),
        }];
        let text = Animation::Standard.playlist(&frames);
        assert_eq!(text.matches("file ").count(), 1);
        assert_eq!(Animation::Standard.playlist(&[]), "ffconcat version 1.0  \n");
    }
}
