// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Border widths of known windows.
//!
//! X reports and accepts sizes without the border, while the scene stores
//! outer sizes. The converter records each window's border as the server
//! reports it and the backend subtracts it again before resizing.

use std::collections::HashMap;
use std::sync::Arc;

use canopy_core::geometry::Rect;
use parking_lot::Mutex;
use x11rb::protocol::xproto::Window;

/// Border widths shared between the converter and the backend.
#[derive(Clone, Debug, Default)]
pub(crate) struct Borders(Arc<Mutex<HashMap<Window, u16>>>);

impl Borders {
    pub(crate) fn record(&self, window: Window, border: u16) {
        let mut borders = self.0.lock();
        if border == 0 {
            borders.remove(&window);
        } else {
            borders.insert(window, border);
        }
    }

    pub(crate) fn forget(&self, window: Window) {
        self.0.lock().remove(&window);
    }

    pub(crate) fn get(&self, window: Window) -> u16 {
        self.0.lock().get(&window).copied().unwrap_or(0)
    }

    /// The size to send in a `ConfigureWindow` for an outer size.
    ///
    /// X rejects zero sizes, so each side is at least one pixel.
    pub(crate) fn inner_size(&self, window: Window, width: u32, height: u32) -> (u32, u32) {
        let border = 2 * u32::from(self.get(window));
        (
            width.saturating_sub(border).max(1),
            height.saturating_sub(border).max(1),
        )
    }
}

/// The outer rectangle of a window the server describes without its border.
pub(crate) fn outer_rect(x: i16, y: i16, width: u16, height: u16, border: u16) -> Rect {
    let border = 2 * u32::from(border);
    Rect::new(
        i32::from(x),
        i32::from(y),
        u32::from(width) + border,
        u32::from(height) + border,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_size_undoes_the_outer_rectangle() {
        let borders = Borders::default();
        borders.record(7, 3);
        let outer = outer_rect(10, 20, 300, 200, 3);
        assert_eq!(outer, Rect::new(10, 20, 306, 206));
        assert_eq!(borders.inner_size(7, outer.width, outer.height), (300, 200));
    }

    #[test]
    fn unknown_and_forgotten_windows_have_no_border() {
        let borders = Borders::default();
        assert_eq!(borders.inner_size(9, 40, 30), (40, 30));
        borders.record(9, 2);
        borders.forget(9);
        assert_eq!(borders.get(9), 0);
    }

    #[test]
    fn inner_size_never_reaches_zero() {
        let borders = Borders::default();
        borders.record(1, 5);
        assert_eq!(borders.inner_size(1, 8, 10), (1, 1));
    }
}
