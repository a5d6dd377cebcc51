use agtable_types::Control;
use agtable_util::is_gmt_value;

/// Whether dates must be shown in GMT: true when any date-range bound
/// (`agDate` control named `start` or `end`) carries a GMT value.
pub fn gmt_flag(controls: &[Control]) -> bool {
    controls
        .iter()
        .filter(|control| control.is_date_bound())
        .any(|control| is_gmt_value(&control.value))
}
