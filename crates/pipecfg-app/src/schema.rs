// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ColumnDescriptor, EntityKind, ID_FIELD};

/// How a field is coerced at the collaborator and operator-input boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCodec {
    Text,
    Integer,
    Decimal,
    Bool,
    /// Wire array of strings; operator input is comma separated.
    List,
}

impl FieldCodec {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Bool => "bool",
            Self::List => "list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub codec: FieldCodec,
    pub filterable: bool,
    pub sortable: bool,
}

const fn field(
    name: &'static str,
    title: &'static str,
    codec: FieldCodec,
    filterable: bool,
    sortable: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        title,
        codec,
        filterable,
        sortable,
    }
}

/// What deleting the referenced record does to the record pointing at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceEffect {
    RemoveFromList,
    ClearField,
    DeleteReferrer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSpec {
    pub from: EntityKind,
    pub field: &'static str,
    pub to: EntityKind,
    pub effect: ReferenceEffect,
    pub action: &'static str,
}

pub const REFERENCES: &[ReferenceSpec] = &[
    ReferenceSpec {
        from: EntityKind::Measurement,
        field: "Fields",
        to: EntityKind::Metric,
        effect: ReferenceEffect::RemoveFromList,
        action: "delete metric from measurement fields",
    },
    ReferenceSpec {
        from: EntityKind::Group,
        field: "Measurements",
        to: EntityKind::Measurement,
        effect: ReferenceEffect::RemoveFromList,
        action: "delete measurement from group",
    },
    ReferenceSpec {
        from: EntityKind::Filter,
        field: "IDMeasurementCfg",
        to: EntityKind::Measurement,
        effect: ReferenceEffect::DeleteReferrer,
        action: "delete filter bound to measurement",
    },
    ReferenceSpec {
        from: EntityKind::Device,
        field: "MeasFilters",
        to: EntityKind::Filter,
        effect: ReferenceEffect::RemoveFromList,
        action: "delete filter from device",
    },
    ReferenceSpec {
        from: EntityKind::Device,
        field: "MeasurementGroups",
        to: EntityKind::Group,
        effect: ReferenceEffect::RemoveFromList,
        action: "delete group from device",
    },
    ReferenceSpec {
        from: EntityKind::Device,
        field: "OutDB",
        to: EntityKind::Server,
        effect: ReferenceEffect::ClearField,
        action: "clear output server from device",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub fields: &'static [FieldSpec],
}

use FieldCodec::{Bool, Decimal, Integer, List, Text};

const DEVICE_FIELDS: &[FieldSpec] = &[
    field(ID_FIELD, "ID", Text, true, true),
    field("Host", "Host", Text, true, true),
    field("Port", "Port", Integer, false, true),
    field("Active", "Active", Bool, false, true),
    field("SnmpVersion", "SNMP Version", Text, true, true),
    field("Freq", "Polling Period (sec)", Integer, false, true),
    field("OutDB", "Output DB", Text, true, true),
    field("MeasurementGroups", "Measurement Groups", List, true, false),
    field("MeasFilters", "Measurement Filters", List, true, false),
    field("ExtraTags", "Extra Tags", List, true, false),
    field("Description", "Description", Text, true, false),
];

const METRIC_FIELDS: &[FieldSpec] = &[
    field(ID_FIELD, "ID", Text, true, true),
    field("FieldName", "Field Name", Text, true, true),
    field("BaseOID", "Base OID", Text, true, true),
    field("DataSrcType", "Data Source Type", Text, true, true),
    field("GetRate", "Get Rate", Bool, false, true),
    field("Scale", "Scale", Decimal, false, true),
    field("Shift", "Shift", Decimal, false, true),
    field("IsTag", "Is Tag", Bool, false, true),
    field("Description", "Description", Text, true, false),
];

const MEASUREMENT_FIELDS: &[FieldSpec] = &[
    field(ID_FIELD, "ID", Text, true, true),
    field("Name", "Name", Text, true, true),
    field("GetMode", "Get Mode", Text, true, true),
    field("IndexOID", "Index OID", Text, true, true),
    field("IndexTag", "Index Tag", Text, true, true),
    field("Fields", "Metric Fields", List, true, false),
    field("Description", "Description", Text, true, false),
];

const FILTER_FIELDS: &[FieldSpec] = &[
    field(ID_FIELD, "ID", Text, true, true),
    field("IDMeasurementCfg", "Measurement", Text, true, true),
    field("FType", "Filter Type", Text, true, true),
    field("FileName", "File Name", Text, true, true),
    field("EnableAlias", "Enable Alias", Bool, false, true),
    field("Description", "Description", Text, true, false),
];

const GROUP_FIELDS: &[FieldSpec] = &[
    field(ID_FIELD, "ID", Text, true, true),
    field("Measurements", "Measurements", List, true, false),
    field("Description", "Description", Text, true, false),
];

const SERVER_FIELDS: &[FieldSpec] = &[
    field(ID_FIELD, "ID", Text, true, true),
    field("Host", "Host", Text, true, true),
    field("Port", "Port", Integer, false, true),
    field("DB", "DB", Text, true, true),
    field("User", "User", Text, true, true),
    field("Retention", "Retention", Text, true, true),
    field("Precision", "Precision", Text, false, true),
    field("Timeout", "Timeout (sec)", Integer, false, true),
    field("Description", "Description", Text, true, false),
];

const DEVICE_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Device,
    fields: DEVICE_FIELDS,
};
const METRIC_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Metric,
    fields: METRIC_FIELDS,
};
const MEASUREMENT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Measurement,
    fields: MEASUREMENT_FIELDS,
};
const FILTER_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Filter,
    fields: FILTER_FIELDS,
};
const GROUP_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Group,
    fields: GROUP_FIELDS,
};
const SERVER_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Server,
    fields: SERVER_FIELDS,
};

impl EntityKind {
    pub const fn schema(self) -> &'static EntitySchema {
        match self {
            Self::Device => &DEVICE_SCHEMA,
            Self::Metric => &METRIC_SCHEMA,
            Self::Measurement => &MEASUREMENT_SCHEMA,
            Self::Filter => &FILTER_SCHEMA,
            Self::Group => &GROUP_SCHEMA,
            Self::Server => &SERVER_SCHEMA,
        }
    }
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn columns(&self) -> Vec<ColumnDescriptor> {
        self.fields
            .iter()
            .map(|spec| ColumnDescriptor {
                name: spec.name.to_owned(),
                title: spec.title.to_owned(),
                filterable: spec.filterable,
                sortable: spec.sortable,
            })
            .collect()
    }

    /// References that point at records of this schema's kind.
    pub fn referenced_by(&self) -> impl Iterator<Item = &'static ReferenceSpec> + '_ {
        REFERENCES.iter().filter(move |reference| reference.to == self.kind)
    }

    /// References held by records of this schema's kind.
    pub fn references(&self) -> impl Iterator<Item = &'static ReferenceSpec> + '_ {
        REFERENCES.iter().filter(move |reference| reference.from == self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldCodec, REFERENCES, ReferenceEffect};
    use crate::{EntityKind, ID_FIELD};

    #[test]
    fn every_schema_leads_with_a_filterable_sortable_id() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            assert_eq!(schema.kind, kind);
            let first = schema.fields[0];
            assert_eq!(first.name, ID_FIELD);
            assert!(first.filterable && first.sortable, "{kind:?}");
        }
    }

    #[test]
    fn reference_fields_exist_with_matching_codecs() {
        for reference in REFERENCES {
            let spec = reference
                .from
                .schema()
                .field(reference.field)
                .unwrap_or_else(|| panic!("missing {} on {:?}", reference.field, reference.from));
            match reference.effect {
                ReferenceEffect::RemoveFromList => assert_eq!(spec.codec, FieldCodec::List),
                ReferenceEffect::ClearField | ReferenceEffect::DeleteReferrer => {
                    assert_eq!(spec.codec, FieldCodec::Text)
                }
            }
        }
    }

    #[test]
    fn referenced_by_lists_measurement_dependents() {
        let kinds: Vec<EntityKind> = EntityKind::Measurement
            .schema()
            .referenced_by()
            .map(|reference| reference.from)
            .collect();
        assert_eq!(kinds, vec![EntityKind::Group, EntityKind::Filter]);
        assert_eq!(EntityKind::Device.schema().referenced_by().count(), 0);
    }

    #[test]
    fn columns_mirror_field_flags() {
        let columns = EntityKind::Device.schema().columns();
        let port = columns
            .iter()
            .find(|column| column.name == "Port")
            .expect("device has a port column");
        assert!(!port.filterable);
        assert!(port.sortable);
        assert_eq!(port.title, "Port");
    }
}
