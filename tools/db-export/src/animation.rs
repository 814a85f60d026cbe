//! Animation sampling and keyframe reduction
//!
//! Bone poses are pulled from a [`PoseSampler`] (the host's "current frame"
//! state made explicit) at a resampled cadence, then each channel is reduced
//! greedily: a sample becomes a key only when it moves further than the
//! channel's tolerance from the last key.

use std::ops::{Deref, DerefMut};

use glam::{Mat4, Quat, Vec3};
use hashbrown::HashMap;

use crate::axis::convert_root_pose;
use crate::scene::{AnimationClip, FrameRange, Skeleton};

/// Local bone transform decomposed into TRS
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BonePose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BonePose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BonePose {
    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Access to the host's animated pose state
///
/// Implementations evaluate the active clip at the current frame. Poses are
/// relative to the parent bone's *current* pose (not its rest pose), using
/// the same hierarchy as the skeleton being exported.
pub trait PoseSampler {
    /// Native frames per second
    fn frame_rate(&self) -> f32;

    fn current_frame(&self) -> i32;

    fn set_frame(&mut self, frame: i32);

    /// Index into `Scene::clips` of the clip being evaluated
    fn active_clip(&self) -> Option<usize>;

    fn set_active_clip(&mut self, clip: Option<usize>);

    /// Local pose of bone `bone` (index into the skeleton's bones)
    fn local_pose(&self, bone: usize) -> BonePose;
}

/// Restores the sampler's frame and active clip when dropped
pub struct SamplerScope<'a, S: PoseSampler + ?Sized> {
    sampler: &'a mut S,
    frame: i32,
    clip: Option<usize>,
}

impl<'a, S: PoseSampler + ?Sized> SamplerScope<'a, S> {
    pub fn new(sampler: &'a mut S) -> Self {
        let frame = sampler.current_frame();
        let clip = sampler.active_clip();
        Self {
            sampler,
            frame,
            clip,
        }
    }
}

impl<S: PoseSampler + ?Sized> Deref for SamplerScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.sampler
    }
}

impl<S: PoseSampler + ?Sized> DerefMut for SamplerScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.sampler
    }
}

impl<S: PoseSampler + ?Sized> Drop for SamplerScope<'_, S> {
    fn drop(&mut self) {
        self.sampler.set_active_clip(self.clip);
        self.sampler.set_frame(self.frame);
    }
}

/// Per-channel reduction tolerances
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Euclidean distance
    pub position: f32,
    /// Degrees
    pub rotation: f32,
    /// Euclidean distance
    pub scale: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            position: 0.1,
            rotation: 0.5,
            scale: 0.1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe<T> {
    /// Seconds (`frame / native frame rate`)
    pub time: f32,
    pub value: T,
}

/// Reduced tracks of one bone
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneTracks {
    pub positions: Vec<Keyframe<Vec3>>,
    pub rotations: Vec<Keyframe<Quat>>,
    pub scales: Vec<Keyframe<Vec3>>,
}

impl BoneTracks {
    fn push(&mut self, time: f32, pose: &BonePose, thresholds: &Thresholds) {
        push_if_moved(&mut self.positions, time, pose.translation, |a, b| {
            a.distance(*b) > thresholds.position
        });
        push_if_moved(&mut self.rotations, time, pose.rotation, |a, b| {
            rotation_difference_degrees(*a, *b) > thresholds.rotation
        });
        push_if_moved(&mut self.scales, time, pose.scale, |a, b| {
            a.distance(*b) > thresholds.scale
        });
    }
}

/// Reduced tracks of one clip, keyed by bone name
#[derive(Clone, Debug, Default)]
pub struct ReducedClip {
    pub name: String,
    pub tracks: HashMap<String, BoneTracks>,
}

fn push_if_moved<T: Copy>(
    track: &mut Vec<Keyframe<T>>,
    time: f32,
    value: T,
    moved: impl Fn(&T, &T) -> bool,
) {
    let append = match track.last() {
        None => true,
        Some(last) => moved(&value, &last.value),
    };
    if append {
        track.push(Keyframe { time, value });
    }
}

/// Shortest-arc angle between two unit quaternions, in degrees
pub fn rotation_difference_degrees(a: Quat, b: Quat) -> f32 {
    let dot = a.dot(b).abs().min(1.0);
    (2.0 * dot.acos()).to_degrees()
}

/// Host frames sampled for `range` at `resample_rate` fps
///
/// Frames are `begin + floor(i * step)` for `i` in `[0, max(1, floor(len / step)))`
/// with `step = native / resample`, deduplicated, followed by `end` itself
/// when the last sample falls short of it.
pub fn sample_frames(range: FrameRange, native_rate: f32, resample_rate: u32) -> Vec<i32> {
    let step = native_rate as f64 / resample_rate.max(1) as f64;
    let length = (range.end - range.begin) as f64;
    let total = ((length / step).floor() as i64).max(1);

    let mut frames: Vec<i32> = if step < 1.0 {
        // Consecutive samples advance by less than a frame, so after
        // deduplication every frame up to the last sample is hit
        let last = range.begin + ((total - 1) as f64 * step).floor() as i32;
        (range.begin..=last).collect()
    } else {
        let mut frames = Vec::with_capacity(total as usize + 1);
        for i in 0..total {
            let frame = range.begin + (i as f64 * step).floor() as i32;
            if frames.last() != Some(&frame) {
                frames.push(frame);
            }
        }
        frames
    };
    if frames.last().is_some_and(|&last| last < range.end) {
        frames.push(range.end);
    }
    frames
}

/// Sample and reduce every bone of `skeleton` over `range`
///
/// The sampler's frame is restored before returning. Root bone poses are
/// converted to runtime axes so they agree with the skeleton's rest matrices.
pub fn reduce<S: PoseSampler + ?Sized>(
    skeleton: &Skeleton,
    sampler: &mut S,
    range: FrameRange,
    resample_rate: u32,
    thresholds: &Thresholds,
) -> HashMap<String, BoneTracks> {
    let mut scope = SamplerScope::new(sampler);
    let native_rate = scope.frame_rate();

    let mut tracks: Vec<BoneTracks> = vec![BoneTracks::default(); skeleton.bones.len()];
    for frame in sample_frames(range, native_rate, resample_rate) {
        scope.set_frame(frame);
        let time = frame as f32 / native_rate;
        for (index, (bone, track)) in skeleton.bones.iter().zip(&mut tracks).enumerate() {
            let mut pose = scope.local_pose(index);
            if bone.parent.is_none() {
                pose = convert_root_pose(pose);
            }
            track.push(time, &pose, thresholds);
        }
    }

    skeleton
        .bones
        .iter()
        .map(|b| b.name.clone())
        .zip(tracks)
        .collect()
}

/// Reduce one clip of the scene, making it the sampler's active clip meanwhile
pub fn reduce_clip<S: PoseSampler + ?Sized>(
    skeleton: &Skeleton,
    sampler: &mut S,
    clip_index: usize,
    clip: &AnimationClip,
    resample_rate: u32,
    thresholds: &Thresholds,
) -> ReducedClip {
    let mut scope = SamplerScope::new(sampler);
    scope.set_active_clip(Some(clip_index));
    let tracks = reduce(
        skeleton,
        &mut *scope,
        clip.frame_range,
        resample_rate,
        thresholds,
    );

    tracing::debug!(
        "Reduced clip '{}': frames {}..={}, {} bones",
        clip.name,
        clip.frame_range.begin,
        clip.frame_range.end,
        tracks.len()
    );

    ReducedClip {
        name: clip.name.clone(),
        tracks,
    }
}
