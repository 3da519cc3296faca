// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::descriptor::ValueKind;

mod internal {
    pub mod keywords {
        pub const CURRENCY: &[&str] = &[
            "sales", "revenue", "income", "profit", "cash", "expenses", "cost", "margin",
            "balance", "amount",
        ];
        pub const PERCENTAGE: &[&str] = &["percentage", "percent", "rate", "ratio"];
        pub const COUNT: &[&str] = &["orders", "customers", "count", "users"];
        pub const TOTAL: &str = "total";
    }
}
use internal::keywords;

/// Classifies a field by name, first match wins. `"margin"` is treated as a
/// percentage only when the name also says so (`marginPercentage`).
pub fn detect_value_kind(field_name: &str, sample: Option<f64>) -> ValueKind {
    let name = field_name.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|word| name.contains(word));
    if has_any(keywords::CURRENCY) && !(name.contains("margin") && has_any(keywords::PERCENTAGE)) {
        return ValueKind::Currency;
    }
    if has_any(keywords::PERCENTAGE) {
        return ValueKind::Percentage;
    }
    if has_any(keywords::COUNT) {
        return ValueKind::Count;
    }
    if name.contains(keywords::TOTAL) && sample.is_some_and(|v| v.is_finite() && v.fract() == 0.0)
    {
        return ValueKind::Count;
    }
    ValueKind::Generic
}
