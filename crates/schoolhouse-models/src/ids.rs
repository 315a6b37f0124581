//! Strongly-typed ID newtypes for domain entities.
//!
//! Each entity gets its own wrapper around `Uuid` so a `StudentId` can never
//! be passed where a `SectionId` is expected. The wrappers are transparent
//! in JSON and in PostgreSQL.

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
        #[schema(value_type = String, format = "uuid")]
        pub struct $name(pub Uuid);

        impl $name {
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[inline]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[inline]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            #[inline]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            #[inline]
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Type<sqlx::Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <Uuid as Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <Uuid as Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <Uuid as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <Uuid as Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        impl PgHasArrayType for $name {
            fn array_type_info() -> PgTypeInfo {
                <Uuid as PgHasArrayType>::array_type_info()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Uuid::deserialize(deserializer).map(Self)
            }
        }
    };
}

define_id!(SchoolId);
define_id!(StaffId);
define_id!(StudentId);
define_id!(AcademicYearId);
define_id!(RoomId);
define_id!(CourseId);
define_id!(SectionId);
define_id!(EnrollmentId);
define_id!(GradeCategoryId);
define_id!(AssignmentId);
define_id!(ScoreId);
define_id!(AttendanceRecordId);
define_id!(IncidentId);
define_id!(IncidentActionId);
define_id!(HealthProfileId);
define_id!(NurseVisitId);
define_id!(RequirementId);
define_id!(ImmunizationRecordId);
define_id!(ExemptionId);
define_id!(FeeTypeId);
define_id!(StudentFeeId);
define_id!(PaymentId);
define_id!(GiftedRecordId);
define_id!(EvaluationId);
define_id!(MealAccountId);
define_id!(MealTransactionId);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_ids_are_unique() {
        let a = StudentId::new();
        let b = StudentId::new();
        assert_ne!(a, b);
        assert!(!a.into_inner().is_nil());
    }

    #[test]
    fn test_debug_names_the_type() {
        let id = SectionId::from_uuid(Uuid::from_u128(0x12345678_1234_1234_1234_123456789abc));
        let debug = format!("{:?}", id);
        assert_eq!(debug, "SectionId(12345678-1234-1234-1234-123456789abc)");
        assert_eq!(id.to_string(), "12345678-1234-1234-1234-123456789abc");
    }

    #[test]
    fn test_json_is_transparent() {
        let id = SchoolId::from_uuid(Uuid::from_u128(1));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""00000000-0000-0000-0000-000000000001""#);

        let back: SchoolId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_from_str() {
        assert!("not-a-uuid".parse::<StaffId>().is_err());
        let id: StaffId = "12345678-1234-1234-1234-123456789abc".parse().unwrap();
        assert_eq!(Uuid::from(id), Uuid::from_u128(0x12345678_1234_1234_1234_123456789abc));
    }

    #[test]
    fn test_hash_set_dedupes() {
        let id = RoomId::new();
        let set: HashSet<RoomId> = [id, id, RoomId::new()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
