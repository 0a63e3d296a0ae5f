//! 図面座標マッピング
//!
//! 画面上のポインタ位置（ピクセル）を、表示サイズに依存しない
//! キャンバス座標（2029×765）へ変換する。
//!
//! 入力はツールキット非依存の `PointerEvent` として受け取り、
//! ポインタを離した時点で候補点を1つだけ発行する。

use crate::types::{CANVAS_HEIGHT, CANVAS_WIDTH};

/// キャンバス座標系の点
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: CanvasPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// 画面座標（ピクセル）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPos {
    pub x: f64,
    pub y: f64,
}

impl ScreenPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// キャンバス座標系の大きさ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewBox {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        }
    }
}

/// 図面が実際に描画されている矩形（画面座標）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// 画面座標 → キャンバス座標
///
/// `((px - RX) * VBW / RW, (py - RY) * VBH / RH)` を計算し、結果を
/// キャンバス範囲内に収める。矩形が潰れている場合や入力が有限値でない
/// 場合は `None`。
pub fn screen_to_canvas(
    view_box: ViewBox,
    rect: ScreenRect,
    pos: ScreenPos,
) -> Option<CanvasPoint> {
    if rect.is_degenerate() || !pos.x.is_finite() || !pos.y.is_finite() {
        return None;
    }
    let x = (pos.x - rect.left) * view_box.width / rect.width;
    let y = (pos.y - rect.top) * view_box.height / rect.height;
    Some(CanvasPoint {
        x: x.clamp(0.0, view_box.width),
        y: y.clamp(0.0, view_box.height),
    })
}

/// キャンバス座標 → 画面座標（マーカー描画用）
pub fn canvas_to_screen(
    view_box: ViewBox,
    rect: ScreenRect,
    point: CanvasPoint,
) -> Option<ScreenPos> {
    if rect.is_degenerate() || view_box.width <= 0.0 || view_box.height <= 0.0 {
        return None;
    }
    Some(ScreenPos {
        x: rect.left + point.x * rect.width / view_box.width,
        y: rect.top + point.y * rect.height / view_box.height,
    })
}

/// ツールキット非依存のポインタ入力
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(ScreenPos),
    Move(ScreenPos),
    Up(ScreenPos),
    /// ポインタが図面外へ出た（位置が取れない場合は None）
    Leave(Option<ScreenPos>),
}

/// 損傷候補点（ポインタを離した位置）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePoint {
    pub point: CanvasPoint,
}

/// 座標マッピング面
///
/// アクティブでない間は全入力を無視する。ドラッグ中の軌跡は
/// 表示用で、ポインタを離すと破棄される。
#[derive(Debug, Clone, Default)]
pub struct DiagramSurface {
    view_box: ViewBox,
    rect: Option<ScreenRect>,
    active: bool,
    stroke: Vec<CanvasPoint>,
    drawing: bool,
}

impl DiagramSurface {
    pub fn new(view_box: ViewBox) -> Self {
        Self {
            view_box,
            ..Default::default()
        }
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    /// 表示矩形を更新（リサイズのたびに呼ぶ）
    pub fn resize(&mut self, rect: ScreenRect) {
        if self.rect != Some(rect) {
            log::trace!("surface resized to {:?}", rect);
            self.rect = Some(rect);
        }
    }

    pub fn rect(&self) -> Option<ScreenRect> {
        self.rect
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 有効/無効の切替。無効化すると描画途中の軌跡は破棄
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.reset_stroke();
        }
    }

    pub fn to_canvas(&self, pos: ScreenPos) -> Option<CanvasPoint> {
        screen_to_canvas(self.view_box, self.rect?, pos)
    }

    pub fn to_screen(&self, point: CanvasPoint) -> Option<ScreenPos> {
        canvas_to_screen(self.view_box, self.rect?, point)
    }

    /// ドラッグ中の一時的な軌跡
    pub fn stroke(&self) -> &[CanvasPoint] {
        &self.stroke
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// ポインタ入力を処理し、離した時点で候補点を返す
    pub fn handle(&mut self, event: PointerEvent) -> Option<CandidatePoint> {
        if !self.active {
            return None;
        }

        match event {
            PointerEvent::Down(pos) => {
                let point = self.to_canvas(pos)?;
                self.stroke.clear();
                self.stroke.push(point);
                self.drawing = true;
                None
            }
            PointerEvent::Move(pos) => {
                if !self.drawing {
                    return None;
                }
                if let Some(point) = self.to_canvas(pos) {
                    self.stroke.push(point);
                }
                None
            }
            PointerEvent::Up(pos) => self.release(Some(pos)),
            PointerEvent::Leave(pos) => self.release(pos),
        }
    }

    fn release(&mut self, pos: Option<ScreenPos>) -> Option<CandidatePoint> {
        if !self.drawing {
            return None;
        }
        let point = pos
            .and_then(|p| self.to_canvas(p))
            .or_else(|| self.stroke.last().copied());
        self.reset_stroke();
        point.map(|point| CandidatePoint { point })
    }

    fn reset_stroke(&mut self) {
        self.stroke.clear();
        self.drawing = false;
    }
}
