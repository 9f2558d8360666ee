use crate::diff::Hunk;

/// Hunks below this pre-image distance must share one patch; applying them
/// separately risks the second application landing against shifted content
/// inside the diff context window.
const MIN_INDEPENDENT_GAP: u32 = 3;

/// A non-empty run of same-file hunks that must be applied in one patch.
/// Ordered by `old_start`; lives only until its patch has been staged.
#[derive(Debug)]
pub struct DependencySubgroup<'a> {
    pub file_path: String,
    pub hunks: Vec<&'a Hunk>,
}

/// Partition one group's hunks into independently applyable subgroups.
///
/// Hunks from different files are always independent. Within a file, two
/// hunks are dependent when their pre-image ranges touch or overlap, or when
/// the gap between them is smaller than the context window. Subgroups come
/// back ordered by first appearance of the file in the input, then by
/// minimum `old_start`.
pub fn split_into_subgroups<'a>(hunks: &[&'a Hunk]) -> Vec<DependencySubgroup<'a>> {
    let mut file_order: Vec<&str> = Vec::new();
    for hunk in hunks {
        if !file_order.contains(&hunk.file_path.as_str()) {
            file_order.push(hunk.file_path.as_str());
        }
    }

    let mut subgroups = Vec::new();
    for file in file_order {
        let mut file_hunks: Vec<&Hunk> = hunks
            .iter()
            .copied()
            .filter(|h| h.file_path == file)
            .collect();
        file_hunks.sort_by_key(|h| h.old_start);

        let mut current: Vec<&Hunk> = Vec::new();
        let mut current_end = 0u32;
        for hunk in file_hunks {
            let dependent = !current.is_empty()
                && hunk.old_start < current_end.saturating_add(MIN_INDEPENDENT_GAP);
            if dependent {
                current_end = current_end.max(hunk.old_start + hunk.old_count);
            } else {
                if !current.is_empty() {
                    subgroups.push(DependencySubgroup {
                        file_path: file.to_string(),
                        hunks: std::mem::take(&mut current),
                    });
                }
                current_end = hunk.old_start + hunk.old_count;
            }
            current.push(hunk);
        }
        if !current.is_empty() {
            subgroups.push(DependencySubgroup {
                file_path: file.to_string(),
                hunks: current,
            });
        }
    }
    subgroups
}
