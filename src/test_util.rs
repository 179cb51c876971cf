#[cfg(test)]
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: HOME is only mutated while HOME_MUTEX is held.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    unsafe {
        match old_home {
            Some(old) => std::env::set_var("HOME", old),
            None => std::env::remove_var("HOME"),
        }
    }
    result
}

#[cfg(test)]
pub(crate) fn sample_record() -> crate::record::WordRecord {
    use crate::record::{Derivative, WordRecord};
    WordRecord {
        term: "resilient".to_string(),
        part_of_speech: "adjective".to_string(),
        meaning: "able to recover quickly".to_string(),
        derivatives: vec![Derivative {
            word: "resilience".to_string(),
            part_of_speech: "noun".to_string(),
        }],
        synonyms: vec!["tough".to_string(), "hardy".to_string()],
        examples: vec!["The resilient team recovered fast.".to_string()],
    }
}
