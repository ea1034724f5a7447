use std::sync::Arc;

use super::BookingApi;
use crate::models::{Store, Therapist, TherapistQuery};

const NAME_HONORIFICS: &[&str] = &["调理师", "老师", "师傅", "医生", "技师"];

/// Maps a parsed therapist/store name onto a therapist record the backend
/// knows about.
pub struct TherapistResolver {
    api: Arc<dyn BookingApi>,
}

impl TherapistResolver {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self { api }
    }

    /// Store-local match first, then any store by name. Without a name the
    /// first therapist of the resolved store is taken.
    pub async fn find(
        &self,
        therapist_name: Option<&str>,
        store_name: Option<&str>,
    ) -> anyhow::Result<Option<Therapist>> {
        let store = match store_name {
            Some(name) => self.find_store(name).await?,
            None => None,
        };

        if let Some(store) = &store {
            let in_store = self
                .api
                .search_therapists(&TherapistQuery::in_store(store.id))
                .await?;

            let matched = match therapist_name {
                Some(name) => best_match(in_store, name),
                None => in_store.into_iter().next(),
            };
            if let Some(therapist) = matched {
                tracing::debug!(store = %store.name, therapist = %therapist.name, "therapist matched in store");
                return Ok(Some(therapist));
            }
        }

        let Some(name) = therapist_name else {
            return Ok(None);
        };

        let everywhere = self.api.search_therapists(&TherapistQuery::by_name(name)).await?;
        let matched = best_match(everywhere, name);
        if let Some(therapist) = &matched {
            tracing::debug!(therapist = %therapist.name, store_id = ?therapist.store_id, "therapist matched across stores");
        }
        Ok(matched)
    }

    async fn find_store(&self, name: &str) -> anyhow::Result<Option<Store>> {
        let stores = self.api.get_stores().await?;
        let store = stores.into_iter().find(|s| stores_match(&s.name, name));
        if store.is_none() {
            tracing::debug!(store = name, "no store matched");
        }
        Ok(store)
    }
}

fn strip_honorifics(name: &str) -> &str {
    let name = name.trim();
    NAME_HONORIFICS
        .iter()
        .find_map(|h| name.strip_suffix(h))
        .unwrap_or(name)
}

/// How well a known therapist name fits the requested one, lower is better.
/// A partial match needs at least two bare characters on the shorter side so
/// a lone surname never picks a different person.
fn match_rank(known: &str, requested: &str) -> Option<u8> {
    let known = known.trim();
    let requested = requested.trim();
    if known == requested {
        return Some(0);
    }

    let known_bare = strip_honorifics(known);
    let requested_bare = strip_honorifics(requested);
    if known_bare.is_empty() || requested_bare.is_empty() {
        return None;
    }
    if known_bare == requested_bare {
        return Some(1);
    }

    let (shorter, longer) = if known_bare.chars().count() <= requested_bare.chars().count() {
        (known_bare, requested_bare)
    } else {
        (requested_bare, known_bare)
    };
    (shorter.chars().count() >= 2 && longer.starts_with(shorter)).then_some(2)
}

fn names_match(known: &str, requested: &str) -> bool {
    match_rank(known, requested).is_some()
}

/// Best-ranked candidate; ties keep backend order.
fn best_match(candidates: Vec<Therapist>, requested: &str) -> Option<Therapist> {
    candidates
        .into_iter()
        .filter_map(|t| match_rank(&t.name, requested).map(|rank| (rank, t)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, t)| t)
}

fn normalize_store(name: &str) -> String {
    name.trim().replacen('·', "", 1).replacen('店', "", 1)
}

fn stores_match(known: &str, requested: &str) -> bool {
    let known_bare = normalize_store(known);
    let requested_bare = normalize_store(requested);
    if known_bare.is_empty() || requested_bare.is_empty() {
        return false;
    }
    known.contains(&requested_bare) || requested.contains(&known_bare)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendReply, SmartAppointmentPayload};
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::Mutex;

    struct FakeApi {
        stores: Vec<Store>,
        therapists: Vec<Therapist>,
        queries: Mutex<Vec<TherapistQuery>>,
    }

    fn store(id: i64, name: &str) -> Store {
        Store {
            id,
            name: name.to_string(),
            address: None,
            extra: Map::new(),
        }
    }

    fn therapist(id: i64, name: &str, store_id: i64) -> Therapist {
        Therapist {
            id,
            name: name.to_string(),
            store_id: Some(store_id),
            specialties: Value::Null,
            extra: Map::new(),
        }
    }

    #[async_trait]
    impl BookingApi for FakeApi {
        async fn get_stores(&self) -> anyhow::Result<Vec<Store>> {
            Ok(self.stores.clone())
        }

        async fn search_therapists(&self, query: &TherapistQuery) -> anyhow::Result<Vec<Therapist>> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(self
                .therapists
                .iter()
                .filter(|t| query.store_id.map_or(true, |id| t.store_id == Some(id)))
                .cloned()
                .collect())
        }

        async fn create_smart_appointment(&self, _: &SmartAppointmentPayload) -> anyhow::Result<BackendReply> {
            unimplemented!()
        }

        async fn get_user_appointments(&self, _: &str) -> anyhow::Result<Value> {
            unimplemented!()
        }

        async fn cancel_appointment(&self, _: &str, _: &str) -> anyhow::Result<BackendReply> {
            unimplemented!()
        }
    }

    fn resolver() -> (Arc<FakeApi>, TherapistResolver) {
        let api = Arc::new(FakeApi {
            stores: vec![
                store(1, "名医堂·颈肩腰腿特色调理（静安寺店）"),
                store(2, "名医堂·颈肩腰腿特色调理（徐汇店）"),
            ],
            therapists: vec![
                therapist(10, "王医生", 1),
                therapist(11, "马老师", 1),
                therapist(20, "马琳", 2),
                therapist(21, "李师傅", 2),
            ],
            queries: Mutex::new(vec![]),
        });
        let resolver = TherapistResolver::new(api.clone());
        (api, resolver)
    }

    #[tokio::test]
    async fn test_matches_within_store() {
        let (api, resolver) = resolver();
        let found = resolver.find(Some("马老师"), Some("静安寺店")).await.unwrap().unwrap();
        assert_eq!(found.id, 11);
        assert_eq!(api.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_other_stores() {
        let (_, resolver) = resolver();
        let found = resolver.find(Some("李老师"), Some("静安寺店")).await.unwrap().unwrap();
        assert_eq!(found.id, 21);
    }

    #[tokio::test]
    async fn test_honorific_mismatch_still_matches() {
        let (_, resolver) = resolver();
        let found = resolver.find(Some("马琳老师"), Some("徐汇店")).await.unwrap().unwrap();
        assert_eq!(found.id, 20);
    }

    #[tokio::test]
    async fn test_no_name_takes_first_in_store() {
        let (_, resolver) = resolver();
        let found = resolver.find(None, Some("徐汇店")).await.unwrap().unwrap();
        assert_eq!(found.id, 20);
    }

    #[tokio::test]
    async fn test_unknown_therapist() {
        let (_, resolver) = resolver();
        assert!(resolver.find(Some("赵老师"), None).await.unwrap().is_none());
        assert!(resolver.find(None, None).await.unwrap().is_none());
    }

    #[test]
    fn test_store_matching_ignores_dot_and_suffix() {
        assert!(stores_match("名医堂·颈肩腰腿特色调理（静安寺店）", "静安寺店"));
        assert!(stores_match(
            "名医堂·颈肩腰腿特色调理（静安寺店）",
            "名医堂·颈肩腰腿特色调理（静安寺店）"
        ));
        assert!(!stores_match("名医堂·颈肩腰腿特色调理（静安寺店）", "徐汇店"));
    }

    #[test]
    fn test_name_matching() {
        assert!(names_match("马老师", "马老师"));
        assert!(names_match("马琳", "马琳老师"));
        assert!(names_match("李师傅", "李老师"));
        assert!(names_match("王医生", "王技师"));
        assert!(names_match("马琳琳", "马琳"));
        assert!(!names_match("马琳", "王老师"));
        assert!(!names_match("马琳", "老师"));
    }

    #[test]
    fn test_lone_surname_does_not_match_other_people() {
        assert!(!names_match("马琳", "马老师"));
        assert!(!names_match("司马强", "马老师"));
        assert!(!names_match("王医生", "王琳"));
        assert!(!names_match("张调理师", "张三"));
    }

    #[tokio::test]
    async fn test_shared_surname_prefers_exact_name() {
        let api = Arc::new(FakeApi {
            stores: vec![store(1, "名医堂·颈肩腰腿特色调理（静安寺店）")],
            therapists: vec![
                therapist(30, "马琳", 1),
                therapist(31, "马老师", 1),
                therapist(32, "马强调理师", 1),
            ],
            queries: Mutex::new(vec![]),
        });
        let resolver = TherapistResolver::new(api);

        let found = resolver.find(Some("马老师"), Some("静安寺店")).await.unwrap().unwrap();
        assert_eq!(found.id, 31);

        let found = resolver.find(Some("马强老师"), Some("静安寺店")).await.unwrap().unwrap();
        assert_eq!(found.id, 32);

        let found = resolver.find(Some("马琳"), Some("静安寺店")).await.unwrap().unwrap();
        assert_eq!(found.id, 30);
    }

    #[tokio::test]
    async fn test_shared_surname_without_exact_name_is_not_found() {
        let api = Arc::new(FakeApi {
            stores: vec![store(1, "名医堂·颈肩腰腿特色调理（静安寺店）")],
            therapists: vec![therapist(30, "马琳", 1), therapist(33, "司马强", 1)],
            queries: Mutex::new(vec![]),
        });
        let resolver = TherapistResolver::new(api);

        assert!(resolver.find(Some("马老师"), Some("静安寺店")).await.unwrap().is_none());
    }
}
