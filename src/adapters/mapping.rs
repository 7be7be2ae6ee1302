use crate::domain::conversion::Conversion;
use crate::domain::fields::TelemetryField;
use crate::domain::model::TelemetrySnapshot;
use serde::{Deserialize, Serialize};

/// 一個模擬器通道 (dataref / SimVar) 到模型欄位的對應
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub source: String,
    pub target: TelemetryField,
    #[serde(default)]
    pub conversion: Conversion,
    /// SimConnect 請求時使用的單位名稱；X-Plane 不需要
    #[serde(default)]
    pub unit: Option<String>,
}

impl Binding {
    pub fn new(source: &str, target: TelemetryField, conversion: Conversion) -> Self {
        Self {
            source: source.to_string(),
            target,
            conversion,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

/// 有序的對應表。X-Plane 以位置作為 RREF 索引。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    bindings: Vec<Binding>,
}

impl MappingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// 覆蓋同一目標欄位的預設對應，其餘附加在最後
    pub fn with_overrides(mut self, overrides: &[Binding]) -> Self {
        for binding in overrides {
            match self.bindings.iter_mut().find(|b| b.target == binding.target) {
                Some(existing) => {
                    tracing::debug!(
                        "🔧 Binding for {} overridden: {} -> {}",
                        binding.target,
                        existing.source,
                        binding.source
                    );
                    *existing = binding.clone();
                }
                None => self.bindings.push(binding.clone()),
            }
        }
        self
    }

    /// 依索引寫入，回傳是否命中
    pub fn apply_index(&self, index: usize, raw: f64, snapshot: &mut TelemetrySnapshot) -> bool {
        match self.bindings.get(index) {
            Some(binding) => {
                binding.target.store(snapshot, raw, binding.conversion);
                true
            }
            None => false,
        }
    }

    /// 依來源名稱寫入，同名的所有對應都會套用
    pub fn apply_named(&self, name: &str, raw: f64, snapshot: &mut TelemetrySnapshot) -> bool {
        let mut matched = false;
        for binding in self.bindings.iter().filter(|b| b.source == name) {
            binding.target.store(snapshot, raw, binding.conversion);
            matched = true;
        }
        matched
    }

    /// 依對應表順序套用整個 frame，確保燃油密度先於依賴它的油箱寫入
    pub fn apply_frame(&self, frame: &[(String, f64)], snapshot: &mut TelemetrySnapshot) -> usize {
        let mut applied = 0;
        for binding in &self.bindings {
            if let Some((_, raw)) = frame.iter().rev().find(|(name, _)| *name == binding.source) {
                binding.target.store(snapshot, *raw, binding.conversion);
                applied += 1;
            }
        }
        applied
    }

    pub fn source_for(&self, target: TelemetryField) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.target == target)
    }
}
