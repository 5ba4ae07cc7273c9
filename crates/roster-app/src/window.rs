// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::ops::RangeInclusive;

pub const DEFAULT_OVERSCAN: usize = 4;

/// Inclusive range of row indices to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    pub first: usize,
    pub last: usize,
}

impl RowWindow {
    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// A window always holds at least one row.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Rows that intersect the viewport, without overscan.
pub fn geometric_range(
    scroll_offset: u32,
    viewport_height: u32,
    row_height: u32,
    row_count: usize,
) -> Option<RowWindow> {
    if row_count == 0 || row_height == 0 {
        return None;
    }
    let row_height = u64::from(row_height);
    let offset = u64::from(scroll_offset);
    let bottom = offset + u64::from(viewport_height.max(1)) - 1;
    let last_index = row_count - 1;
    let first = usize::try_from(offset / row_height).unwrap_or(usize::MAX);
    if first > last_index {
        return Some(RowWindow {
            first: last_index,
            last: last_index,
        });
    }
    let last = usize::try_from(bottom / row_height)
        .unwrap_or(usize::MAX)
        .min(last_index);
    Some(RowWindow { first, last })
}

/// Minimal contiguous range to materialize for a fixed-height list, widened by
/// `overscan` on both ends and clamped to `[0, row_count - 1]`.
pub fn visible_range(
    scroll_offset: u32,
    viewport_height: u32,
    row_height: u32,
    row_count: usize,
    overscan: usize,
) -> Option<RowWindow> {
    let visible = geometric_range(scroll_offset, viewport_height, row_height, row_count)?;
    Some(RowWindow {
        first: visible.first.saturating_sub(overscan),
        last: visible.last.saturating_add(overscan).min(row_count - 1),
    })
}

pub fn content_height(row_count: usize, row_height: u32) -> u64 {
    row_count as u64 * u64::from(row_height)
}

pub fn max_scroll(row_count: usize, row_height: u32, viewport_height: u32) -> u32 {
    let overflow = content_height(row_count, row_height).saturating_sub(u64::from(viewport_height));
    u32::try_from(overflow).unwrap_or(u32::MAX)
}

/// Smallest scroll change that brings row `index` fully into view.
pub fn ensure_visible(scroll_offset: u32, viewport_height: u32, row_height: u32, index: usize) -> u32 {
    let top = u64::try_from(index).unwrap_or(u64::MAX) * u64::from(row_height);
    let bottom = top + u64::from(row_height);
    let offset = u64::from(scroll_offset);
    let viewport = u64::from(viewport_height);
    let next = if top < offset {
        top
    } else if bottom > offset + viewport {
        bottom.saturating_sub(viewport)
    } else {
        offset
    };
    u32::try_from(next).unwrap_or(u32::MAX)
}

/// Fires the loader once each time the trailing loader row enters the
/// materialized window, not once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoaderSentinel {
    visible_at: Option<usize>,
}

impl LoaderSentinel {
    /// `loader_index` is the loader row's position, or `None` when no more
    /// pages exist. Returns true on the frame the loader becomes visible.
    pub fn observe(&mut self, window: Option<RowWindow>, loader_index: Option<usize>) -> bool {
        let visible = match (window, loader_index) {
            (Some(window), Some(index)) if window.contains(index) => Some(index),
            _ => None,
        };
        let fire = visible.is_some() && visible != self.visible_at;
        self.visible_at = visible;
        fire
    }

    pub fn reset(&mut self) {
        self.visible_at = None;
    }
}
