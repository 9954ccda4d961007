use super::{ActionContext, TrackField};
use crate::media::{convert_if_needed, write_tags};
use crate::store::TrackRecord;
use crate::track::{add_scheme, Track, TrackRef};
use crate::transport::{send_audio_with_retries, Markup};
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{debug, info, warn};

const DOWNLOADING_TEXT: &str = "Downloading...";
const DOWNLOAD_FAILED_TEXT: &str = "Failed to download the file";

fn record(track: &Track) -> TrackRecord {
    TrackRecord {
        url: track.url.clone(),
        title: track.title.clone(),
        author: track.author.clone(),
        duration: track.duration,
    }
}

/// Sends the track to the chat, downloading it into the library first unless
/// the user already has the file.
pub fn download_track(track: &TrackRef, ctx: &ActionContext<'_>) -> Result<()> {
    let current = track.borrow().clone();
    if let Some(id) = current.stored_id {
        if ctx.media.has_file(id) {
            debug!("Track {} is already stored, sending it", id);
            return send_stored(id, &current, ctx);
        }
    }

    let progress = ctx
        .transport
        .send_message(ctx.chat_id, DOWNLOADING_TEXT, None)?;
    let result = fetch_and_send(track, &current, ctx);
    if let Err(err) = ctx.transport.delete_message(ctx.chat_id, progress) {
        warn!("Failed to delete progress message {}: {}", progress, err);
    }
    result
}

fn fetch_and_send(track: &TrackRef, current: &Track, ctx: &ActionContext<'_>) -> Result<()> {
    let url = add_scheme(&current.url);
    let start = Instant::now();
    let Some(bytes) = ctx.fetcher.fetch(&url)? else {
        ctx.reply(DOWNLOAD_FAILED_TEXT, None)?;
        return Ok(());
    };
    debug!("Fetched {} in {:?}", url, start.elapsed());

    let id = ctx
        .store
        .add_or_update_track(ctx.user_id, &record(current))?;
    track.borrow_mut().stored_id = Some(id);

    let path = ctx.media.save(id, &bytes)?;
    if let Err(err) = convert_if_needed(&path, ctx.media_settings) {
        // Without the file the next download starts over.
        ctx.media.remove(id, &current.author, &current.title)?;
        return Err(err).with_context(|| format!("Failed to convert {}", url));
    }
    if let Err(err) = write_tags(&path, &current.title, &current.author) {
        warn!("{:?}", err);
    }
    info!("Stored {} as track {} of user {}", url, id, ctx.user_id);

    send_stored(id, current, ctx)
}

fn send_stored(id: i64, track: &Track, ctx: &ActionContext<'_>) -> Result<()> {
    let link = ctx.media.link(id, &track.author, &track.title)?;
    send_audio_with_retries(
        ctx.transport,
        ctx.chat_id,
        &link,
        Some(&Markup::RemoveKeyboard),
        ctx.max_send_tries,
    )
    .with_context(|| format!("Failed to send {:?}", link))?;
    Ok(())
}

/// Changes one field of the shared track. Stored tracks also get their
/// library row, tags and link updated.
pub fn rename_track(
    track: &TrackRef,
    field: TrackField,
    value: &str,
    ctx: &ActionContext<'_>,
) -> Result<()> {
    let old = track.borrow().clone();
    {
        let mut track = track.borrow_mut();
        match field {
            TrackField::Author => track.author = value.to_string(),
            TrackField::Title => track.title = value.to_string(),
        }
    }
    let new = track.borrow().clone();

    let Some(id) = new.stored_id else {
        return Ok(());
    };
    if !ctx.store.update_track(id, &record(&new))? {
        warn!("Track {} is no longer in the library", id);
        track.borrow_mut().stored_id = None;
        return Ok(());
    }
    if ctx.media.has_file(id) {
        ctx.media.unlink(id, &old.author, &old.title)?;
        if let Err(err) = write_tags(&ctx.media.stored_path(id), &new.title, &new.author) {
            warn!("{:?}", err);
        }
        ctx.media.link(id, &new.author, &new.title)?;
    }
    Ok(())
}

/// Removes the track from the library and deletes its files.
pub fn delete_track(track: &TrackRef, ctx: &ActionContext<'_>) -> Result<()> {
    let current = track.borrow().clone();
    let Some(id) = current.stored_id else {
        return Ok(());
    };
    ctx.store.delete_track(id)?;
    ctx.media.remove(id, &current.author, &current.title)?;
    track.borrow_mut().stored_id = None;
    info!("Deleted track {} of user {}", id, ctx.user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, Stage};
    use crate::media::{AudioFetcher, MediaLibrary, MediaSettings};
    use crate::store::{LibraryStore, SqliteStore};
    use crate::transport::{
        ChatId, InboundEvent, InlineKeyboard, MessageId, Transport, TransportError,
    };
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Chat {
        texts: RefCell<Vec<String>>,
        deleted: RefCell<Vec<MessageId>>,
        audio: RefCell<Vec<PathBuf>>,
    }

    impl Transport for Chat {
        fn poll_events(&self) -> Result<Vec<InboundEvent>, TransportError> {
            Ok(Vec::new())
        }

        fn send_message(
            &self,
            _chat_id: ChatId,
            text: &str,
            _markup: Option<&Markup>,
        ) -> Result<MessageId, TransportError> {
            let mut texts = self.texts.borrow_mut();
            texts.push(text.to_string());
            Ok(texts.len() as MessageId)
        }

        fn edit_inline_keyboard(
            &self,
            _chat_id: ChatId,
            _message_id: MessageId,
            _keyboard: Option<&InlineKeyboard>,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        fn delete_message(&self, _chat_id: ChatId, message_id: MessageId) -> Result<(), TransportError> {
            self.deleted.borrow_mut().push(message_id);
            Ok(())
        }

        fn send_audio(
            &self,
            _chat_id: ChatId,
            path: &Path,
            _markup: Option<&Markup>,
        ) -> Result<(), TransportError> {
            self.audio.borrow_mut().push(path.to_path_buf());
            Ok(())
        }

        fn answer_callback(&self, _callback_id: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct Fetcher {
        body: Option<Vec<u8>>,
        calls: RefCell<Vec<String>>,
    }

    impl AudioFetcher for Fetcher {
        fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
            self.calls.borrow_mut().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    struct Fixture {
        dir: TempDir,
        store: SqliteStore,
        media: MediaLibrary,
        settings: MediaSettings,
        chat: Chat,
        fetcher: Fetcher,
    }

    impl Fixture {
        fn new(body: Option<&[u8]>) -> Self {
            let dir = TempDir::new().unwrap();
            let store = SqliteStore::new(dir.path().join("bot.db")).unwrap();
            store.add_or_update_user(7, "user").unwrap();
            let media = MediaLibrary::new(dir.path().join("tracks"), "mp3").unwrap();
            Self {
                dir,
                store,
                media,
                settings: MediaSettings {
                    convert: false,
                    ..MediaSettings::default()
                },
                chat: Chat::default(),
                fetcher: Fetcher {
                    body: body.map(|b| b.to_vec()),
                    calls: RefCell::new(Vec::new()),
                },
            }
        }

        fn ctx(&self) -> ActionContext<'_> {
            ActionContext {
                transport: &self.chat,
                store: &self.store,
                media: &self.media,
                media_settings: &self.settings,
                fetcher: &self.fetcher,
                chat_id: 7,
                user_id: 7,
                max_send_tries: 3,
            }
        }
    }

    fn track() -> TrackRef {
        Track::new("site.org/song.mp3", "Song", "Band", Some(200), None, 1).into_ref()
    }

    #[test]
    fn test_download_stores_links_and_sends() {
        let fixture = Fixture::new(Some(b"audio"));
        let track = track();

        download_track(&track, &fixture.ctx()).unwrap();

        let id = track.borrow().stored_id.unwrap();
        assert!(fixture.media.has_file(id));
        assert_eq!(
            fixture.fetcher.calls.borrow().as_slice(),
            &["https://site.org/song.mp3".to_string()]
        );
        assert_eq!(
            fixture.chat.audio.borrow().as_slice(),
            &[fixture.media.link_path("Band", "Song")]
        );
        assert_eq!(fixture.chat.texts.borrow().as_slice(), &[DOWNLOADING_TEXT.to_string()]);
        assert_eq!(fixture.chat.deleted.borrow().as_slice(), &[1]);

        let stored = fixture.store.get_track(id).unwrap().unwrap();
        assert_eq!(stored.url, "site.org/song.mp3");
        assert_eq!(stored.duration, Some(200));
        assert!(fixture.dir.path().join("tracks").join("Band").exists());
    }

    #[test]
    fn test_download_reuses_stored_file() {
        let fixture = Fixture::new(Some(b"audio"));
        let track = track();
        download_track(&track, &fixture.ctx()).unwrap();
        download_track(&track, &fixture.ctx()).unwrap();

        assert_eq!(fixture.fetcher.calls.borrow().len(), 1);
        assert_eq!(fixture.chat.audio.borrow().len(), 2);
    }

    #[test]
    fn test_same_name_tracks_send_their_own_audio() {
        let fixture = Fixture::new(Some(b"audio"));
        let first = track();
        let second =
            Track::new("other.org/song.mp3", "Song", "Band", Some(200), None, 2).into_ref();

        download_track(&first, &fixture.ctx()).unwrap();
        download_track(&second, &fixture.ctx()).unwrap();
        let first_id = first.borrow().stored_id.unwrap();
        let second_id = second.borrow().stored_id.unwrap();
        assert_ne!(first_id, second_id);

        let sent = fixture.chat.audio.borrow().clone();
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0], sent[1]);
        assert_eq!(
            std::fs::canonicalize(&sent[1]).unwrap(),
            std::fs::canonicalize(fixture.media.stored_path(second_id)).unwrap()
        );

        delete_track(&first, &fixture.ctx()).unwrap();
        assert!(fixture.media.has_file(second_id));
        assert!(sent[1].exists());
    }

    #[test]
    fn test_failed_download_reports_and_stores_nothing() {
        let fixture = Fixture::new(None);
        let track = track();

        download_track(&track, &fixture.ctx()).unwrap();

        assert_eq!(track.borrow().stored_id, None);
        assert!(fixture.chat.audio.borrow().is_empty());
        assert_eq!(
            fixture.chat.texts.borrow().as_slice(),
            &[DOWNLOADING_TEXT.to_string(), DOWNLOAD_FAILED_TEXT.to_string()]
        );
        assert!(fixture.store.list_tracks(7, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_rename_stored_track_moves_link() {
        let fixture = Fixture::new(Some(b"audio"));
        let track = track();
        download_track(&track, &fixture.ctx()).unwrap();
        let id = track.borrow().stored_id.unwrap();

        rename_track(&track, TrackField::Author, "Other Band", &fixture.ctx()).unwrap();

        assert_eq!(track.borrow().author, "Other Band");
        assert_eq!(fixture.store.get_track(id).unwrap().unwrap().author, "Other Band");
        assert!(std::fs::symlink_metadata(fixture.media.link_path("Band", "Song")).is_err());
        assert!(fixture.media.link_path("Other Band", "Song").exists());
    }

    #[test]
    fn test_rename_unstored_track_only_changes_memory() {
        let fixture = Fixture::new(Some(b"audio"));
        let track = track();

        rename_track(&track, TrackField::Title, "New", &fixture.ctx()).unwrap();

        assert_eq!(track.borrow().title, "New");
        assert!(fixture.store.list_tracks(7, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_confirmation() {
        let fixture = Fixture::new(Some(b"audio"));
        let track = track();
        download_track(&track, &fixture.ctx()).unwrap();
        let id = track.borrow().stored_id.unwrap();

        let action = Action::DeleteConfirm {
            track: track.clone(),
            stage: Stage::Start,
        };
        let action = action.handle("Delete", &fixture.ctx()).unwrap();
        assert!(matches!(
            action,
            Action::DeleteConfirm {
                stage: Stage::AwaitingInput,
                ..
            }
        ));
        let action = action.handle("no", &fixture.ctx()).unwrap();
        assert!(action.is_idle());
        assert!(fixture.media.has_file(id));

        let action = Action::DeleteConfirm {
            track: track.clone(),
            stage: Stage::AwaitingInput,
        };
        action.handle("YES", &fixture.ctx()).unwrap();
        assert!(!fixture.media.has_file(id));
        assert_eq!(fixture.store.get_track(id).unwrap(), None);
        assert_eq!(track.borrow().stored_id, None);
    }

    #[test]
    fn test_menu_starts_edit_and_commits() {
        let fixture = Fixture::new(Some(b"audio"));
        let track = track();

        let action = Action::ChooseAction(track.clone());
        for label in ["Edit author", "Edit title", "Download", "Delete"] {
            assert!(action.accepts(label), "{}", label);
        }
        assert!(!action.accepts("edit title"));
        assert!(!action.accepts("Band - Song"));
        assert!(!action.accepts(""));

        let idle = Action::NoAction;
        for input in ["Edit title", "Delete", "yes", "anything"] {
            assert!(!idle.accepts(input), "{}", input);
        }

        let action = action.handle("Edit title", &fixture.ctx()).unwrap();
        assert!(matches!(
            action,
            Action::EditTitle {
                stage: Stage::AwaitingInput,
                ..
            }
        ));
        assert_eq!(
            fixture.chat.texts.borrow().last().unwrap(),
            "Current title: Song\nSend the new title"
        );

        let action = action.handle("  Better Song ", &fixture.ctx()).unwrap();
        assert!(action.is_idle());
        assert_eq!(track.borrow().title, "Better Song");
    }
}
