mod result_set;
mod row;

pub use result_set::{DataSet, ResultSet};
pub use row::DbRow;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::ParamValue;

    #[test]
    fn rows_share_column_lookup() {
        let mut rs = ResultSet::new(vec!["Id".into(), "Name".into()]);
        rs.add_row_values(vec![ParamValue::Int(1), ParamValue::Text("a".into())]);
        rs.add_row_values(vec![ParamValue::Int(2), ParamValue::DbNull]);

        assert_eq!(rs.len(), 2);
        assert!(Arc::ptr_eq(&rs.rows[0].column_names, &rs.rows[1].column_names));
        assert_eq!(rs.rows[1].get("name"), Some(&ParamValue::DbNull));
        assert_eq!(rs.rows[0].get("Name").and_then(ParamValue::as_text), Some("a"));
        assert_eq!(rs.scalar(), ParamValue::Int(1));
    }

    #[test]
    fn empty_set_scalar_is_null() {
        let rs = ResultSet::new(vec!["x".into()]);
        assert!(rs.scalar().is_null());
    }

    #[test]
    fn data_set_serializes_rows() {
        let mut rs = ResultSet::new(vec!["n".into()]);
        rs.add_row_values(vec![ParamValue::BigInt(5)]);
        let ds = DataSet::new(vec![rs]);
        let json = serde_json::to_value(&ds).unwrap();
        assert_eq!(json["tables"][0]["columns"][0], "n");
        assert_eq!(json["tables"][0]["rows"][0]["values"][0], 5);
    }
}
