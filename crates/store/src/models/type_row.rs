use crate::error::{Error, ErrorKind};
use crate::types::{ChangeLevel, SourceId, Type, TypeId};
use exn::{OptionExt, ResultExt};
use qmlsync_parse::models::AccessSemantics;
use serde_json::{from_str as from_json, to_string as to_json};

/// A row of the `types` table. Declaration lists are JSON arrays.
#[derive(sqlx::FromRow)]
pub(crate) struct TypeRow {
    #[sqlx(default)]
    pub(crate) type_id: Option<TypeId>,
    pub(crate) source_id: SourceId,
    pub(crate) name: String,
    pub(crate) prototype: Option<String>,
    pub(crate) access_semantics: String,
    pub(crate) properties: String,
    pub(crate) functions: String,
    pub(crate) signals: String,
    pub(crate) enumerations: String,
}
impl TryFrom<&Type> for TypeRow {
    type Error = Error;
    fn try_from(ty: &Type) -> Result<Self, Self::Error> {
        Ok(Self {
            type_id: None,
            source_id: ty.source_id,
            name: ty.type_name.clone(),
            prototype: ty.prototype.clone(),
            access_semantics: ty.access_semantics.as_str().to_string(),
            properties: to_json(&ty.properties).or_raise(|| ErrorKind::InvalidData("properties"))?,
            functions: to_json(&ty.functions).or_raise(|| ErrorKind::InvalidData("functions"))?,
            signals: to_json(&ty.signals).or_raise(|| ErrorKind::InvalidData("signals"))?,
            enumerations: to_json(&ty.enumerations).or_raise(|| ErrorKind::InvalidData("enumerations"))?,
        })
    }
}
impl TryFrom<TypeRow> for Type {
    type Error = Error;
    /// Exported names live in their own table; the caller fills them in.
    fn try_from(row: TypeRow) -> Result<Self, Self::Error> {
        Ok(Type {
            type_name: row.name,
            prototype: row.prototype,
            access_semantics: AccessSemantics::parse(&row.access_semantics)
                .ok_or_raise(|| ErrorKind::InvalidData("access semantics"))?,
            source_id: row.source_id,
            change_level: ChangeLevel::Full,
            exported_types: Vec::new(),
            properties: from_json(&row.properties).or_raise(|| ErrorKind::InvalidData("properties"))?,
            functions: from_json(&row.functions).or_raise(|| ErrorKind::InvalidData("functions"))?,
            signals: from_json(&row.signals).or_raise(|| ErrorKind::InvalidData("signals"))?,
            enumerations: from_json(&row.enumerations).or_raise(|| ErrorKind::InvalidData("enumerations"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlsync_parse::models::PropertyDeclaration;

    #[test]
    fn test_model_to_row_and_back() {
        let mut ty = Type::new("Bar", SourceId(3));
        ty.prototype = Some("QObject".to_string());
        ty.access_semantics = AccessSemantics::Value;
        ty.properties.push(PropertyDeclaration {
            name: "count".to_string(),
            type_name: "int".to_string(),
            is_readonly: true,
            ..PropertyDeclaration::default()
        });
        let row = TypeRow::try_from(&ty).unwrap();
        assert_eq!(row.access_semantics, "value");
        assert_eq!(row.functions, "[]");
        let back = Type::try_from(row).unwrap();
        assert_eq!(back, ty);
    }

    #[test]
    fn test_row_with_broken_json() {
        let row = TypeRow {
            type_id: Some(TypeId(1)),
            source_id: SourceId(1),
            name: "Broken".to_string(),
            prototype: None,
            access_semantics: "reference".to_string(),
            properties: "{not json".to_string(),
            functions: "[]".to_string(),
            signals: "[]".to_string(),
            enumerations: "[]".to_string(),
        };
        let err = Type::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("properties")));
    }
}
