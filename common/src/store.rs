//! マーカーストア
//!
//! IDをキーとしたマップ + 挿入順リスト。並び順は挿入順のみで、
//! その順序はレポートの見出し順にそのまま現れる。

use crate::canvas::CanvasPoint;
use crate::types::{DamageMarker, MarkerDraft, MarkerId, MarkerPatch};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    markers: HashMap<MarkerId, DamageMarker>,
    order: Vec<MarkerId>,
    next_seq: u64,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存マーカー列から復元
    ///
    /// 全マーカーを残す。IDが重複していれば後のマーカーに新しいIDを振る。
    pub fn from_markers(markers: impl IntoIterator<Item = DamageMarker>) -> Self {
        let mut store = Self::new();
        for mut marker in markers {
            if store.contains(&marker.id) {
                let fresh = store.fresh_id();
                log::warn!("duplicate marker id {} on load, renamed to {}", marker.id, fresh);
                marker.id = fresh;
            }
            store.add(marker.into());
        }
        store
    }

    /// 末尾に追加し、割り当てたIDを返す
    ///
    /// IDが未指定なら新規採番。既存IDが指定された場合はその位置で置換する。
    pub fn add(&mut self, draft: MarkerDraft) -> MarkerId {
        let id = match draft.id {
            Some(id) => id,
            None => self.fresh_id(),
        };

        let marker = DamageMarker {
            id: id.clone(),
            x: draft.x,
            y: draft.y,
            damage_type: draft.damage_type,
            severity: draft.severity,
            description: draft.description,
        };

        if self.markers.insert(id.clone(), marker).is_none() {
            self.order.push(id.clone());
            log::debug!("marker {} added ({} total)", id, self.order.len());
        } else {
            log::debug!("marker {} replaced in place", id);
        }
        id
    }

    /// 指定IDのマーカーを部分更新（位置は維持）
    pub fn update(&mut self, id: &MarkerId, patch: MarkerPatch) -> bool {
        match self.markers.get_mut(id) {
            Some(marker) => {
                patch.apply(marker);
                log::debug!("marker {} updated", id);
                true
            }
            None => false,
        }
    }

    /// 削除（存在しなくてもエラーにしない）
    pub fn delete(&mut self, id: &MarkerId) -> bool {
        if self.markers.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
            log::debug!("marker {} deleted ({} left)", id, self.order.len());
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.markers.clear();
        self.order.clear();
    }

    pub fn get(&self, id: &MarkerId) -> Option<&DamageMarker> {
        self.markers.get(id)
    }

    pub fn contains(&self, id: &MarkerId) -> bool {
        self.markers.contains_key(id)
    }

    /// 挿入順に列挙
    pub fn iter(&self) -> impl Iterator<Item = &DamageMarker> + '_ {
        self.order.iter().filter_map(|id| self.markers.get(id))
    }

    pub fn to_vec(&self) -> Vec<DamageMarker> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 指定点から半径内にあるマーカーのうち最前面（最後に追加されたもの）
    pub fn hit_test(&self, point: CanvasPoint, radius: f64) -> Option<&DamageMarker> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.markers.get(id))
            .find(|m| CanvasPoint::new(m.x, m.y).distance_to(point) <= radius)
    }

    fn fresh_id(&mut self) -> MarkerId {
        loop {
            self.next_seq += 1;
            let id = MarkerId::new(format!("m{}", self.next_seq));
            if !self.markers.contains_key(&id) {
                return id;
            }
        }
    }
}
