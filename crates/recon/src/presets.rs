//! Starter configs for common reconciliation jobs. Domain knowledge lives
//! here as plain TOML, not in engine code.

pub const PRESET_NAMES: &[&str] = &["receivables", "inventory", "hr"];

const RECEIVABLES: &str = r#"# Bank deposits vs billing records, matched on receipt/invoice number.
name = "Receivables"

[source]
file = "deposits.csv"
key = "receipt_no"

[target]
file = "billing.csv"
key = "invoice_number"

[amount]
field = "amount"
tolerance = { absolute = 0.01 }

[output]
dir = "output"
"#;

const INVENTORY: &str = r#"# System stock vs physical count, matched on SKU.
name = "Inventory"

[source]
file = "system_stock.csv"
key = "sku_code"

[target]
file = "physical_count.csv"
key = "sku"

[amount]
field = "system_quantity"
target_field = "actual_quantity"
tolerance = { percent = 2.0 }

[output]
dir = "output"

[[projections]]
name = "discrepancy_report"
from = "unreconciled"
columns = [
    { name = "sku_code", from = ["sku_code", "sku"] },
    { name = "product_name", from = ["product_name", "name"] },
    { name = "system_quantity" },
    { name = "actual_quantity" },
    { name = "difference" },
]
"#;

const HR: &str = r#"# HR master vs department listing, matched on employee id.
name = "HR"

[source]
file = "hr_master.csv"
key = "employee_id"

[target]
file = "dept_list.csv"
key = "emp_id"

[[rules]]
field = "department_code"
target_field = "dept"
severity = "Warning"

[[rules]]
field = "title_code"
severity = "Error"

[output]
dir = "output"
report = "inconsistent_hr_data.csv"
"#;

/// TOML text of a built-in preset.
pub fn preset(name: &str) -> Option<&'static str> {
    match name {
        "receivables" => Some(RECEIVABLES),
        "inventory" => Some(INVENTORY),
        "hr" => Some(HR),
        _ => None,
    }
}
